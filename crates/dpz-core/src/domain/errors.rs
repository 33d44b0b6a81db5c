use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DpzResult<T> = Result<T, DpzError>;
pub type ParserResult<T> = DpzResult<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DpzErrorCategory {
    Usage,
    NotFound,
    Format,
    Parse,
    UnknownModel,
    Grouping,
    Io,
}

impl DpzErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Usage => 1,
            Self::NotFound => 2,
            Self::Format => 3,
            Self::Parse => 4,
            Self::UnknownModel => 5,
            Self::Grouping => 6,
            Self::Io => 7,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Usage => "UsageError",
            Self::NotFound => "NotFoundError",
            Self::Format => "FormatError",
            Self::Parse => "ParseError",
            Self::UnknownModel => "UnknownModelError",
            Self::Grouping => "GroupingError",
            Self::Io => "IoError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpzError {
    category: DpzErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl DpzError {
    pub fn new(
        category: DpzErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn usage(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(DpzErrorCategory::Usage, placeholder, message)
    }

    pub fn not_found(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(DpzErrorCategory::NotFound, placeholder, message)
    }

    pub fn format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(DpzErrorCategory::Format, placeholder, message)
    }

    pub fn parse(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(DpzErrorCategory::Parse, placeholder, message)
    }

    pub fn unknown_model(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(DpzErrorCategory::UnknownModel, placeholder, message)
    }

    pub fn grouping(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(DpzErrorCategory::Grouping, placeholder, message)
    }

    pub fn io(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(DpzErrorCategory::Io, placeholder, message)
    }

    pub const fn category(&self) -> DpzErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for DpzError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for DpzError {}
