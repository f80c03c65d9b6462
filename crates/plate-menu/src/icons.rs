use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuIcon {
    Blockquote,
    Bold,
    ChevronDown,
    CodeXml,
    Heading,
    Image,
    Italic,
    JoinUp,
    Lift,
    Link,
    List,
    ListOrdered,
    Minus,
    Table,
    Text,
}

impl MenuIcon {
    pub fn path(self) -> &'static str {
        match self {
            Self::Blockquote => "icons/text-quote.svg",
            Self::Bold => "icons/bold.svg",
            Self::ChevronDown => "icons/chevron-down.svg",
            Self::CodeXml => "icons/code-xml.svg",
            Self::Heading => "icons/heading.svg",
            Self::Image => "icons/image.svg",
            Self::Italic => "icons/italic.svg",
            Self::JoinUp => "icons/arrow-up-to-line.svg",
            Self::Lift => "icons/indent-decrease.svg",
            Self::Link => "icons/link.svg",
            Self::List => "icons/list.svg",
            Self::ListOrdered => "icons/list-ordered.svg",
            Self::Minus => "icons/minus.svg",
            Self::Table => "icons/table.svg",
            Self::Text => "icons/type.svg",
        }
    }
}
