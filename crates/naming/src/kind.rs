//! The fixed content kind table.

use crate::error::{ErrorKind, Result};

/// Content kinds the rewriter knows how to name.
///
/// Each kind maps 1:1 onto a single-character extension code used inside
/// encoded resource names, a canonical file extension used outside them,
/// and a MIME type used when serving. The table is closed: a code outside
/// it fails decoding with [`UnknownExtensionCode`](ErrorKind::UnknownExtensionCode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Css,
    Jpeg,
    Javascript,
}

impl ContentKind {
    /// The single-character code embedded in encoded resource names.
    pub fn code(self) -> char {
        match self {
            Self::Css => 's',
            Self::Jpeg => 'j',
            Self::Javascript => 'l',
        }
    }

    /// Reverse lookup of [`code`](Self::code).
    pub fn from_code(code: char) -> Result<Self> {
        match code {
            's' => Ok(Self::Css),
            'j' => Ok(Self::Jpeg),
            'l' => Ok(Self::Javascript),
            other => Err(exn::Exn::from(ErrorKind::UnknownExtensionCode(other))),
        }
    }

    /// The canonical file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Jpeg => "jpg",
            Self::Javascript => "js",
        }
    }

    /// Look a kind up by file extension (without the leading dot).
    ///
    /// Returns `None` for extensions outside the table; references with
    /// unknown extensions are simply not eligible for rewriting.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "css" => Some(Self::Css),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "js" => Some(Self::Javascript),
            _ => None,
        }
    }

    /// The MIME type to serve rewritten artifacts with.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Css => "text/css",
            Self::Jpeg => "image/jpeg",
            Self::Javascript => "text/javascript",
        }
    }

    /// Look a kind up by MIME type, ignoring any parameters.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match essence {
            "text/css" => Some(Self::Css),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "text/javascript" | "application/javascript" | "application/x-javascript" => {
                Some(Self::Javascript)
            }
            _ => None,
        }
    }
}
