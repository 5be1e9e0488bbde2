use std::fmt;

/// What asked for a refresh; carried into logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Startup,
    Timer,
    Manual,
}

/// Services the host surface accepts under `/api/services/{name}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCall {
    NextImage,
    PreviousImage,
    Refresh,
}

impl ServiceCall {
    pub const ALL: &'static [Self] = &[Self::NextImage, Self::PreviousImage, Self::Refresh];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NextImage => "next_image",
            Self::PreviousImage => "previous_image",
            Self::Refresh => "refresh",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|call| call.as_str() == name)
    }
}

impl fmt::Display for ServiceCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
