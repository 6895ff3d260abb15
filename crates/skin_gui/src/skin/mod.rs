//! Skin loading
//!
//! [`XmlElement`] is the parsed form of a skin file and [`SkinInfo`] locates
//! window files among the skin's resolution folders. Include expansion is
//! not performed; `<include>` elements are left in place and ignored by the
//! control factory.

mod skin_info;
pub mod xml;

pub use skin_info::SkinInfo;
pub use xml::XmlElement;

use thiserror::Error;

/// Skin loading errors
#[derive(Debug, Error)]
pub enum SkinError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed XML
    #[error("XML error at byte {position}: {reason}")]
    Xml {
        /// Byte offset of the failing event
        position: usize,
        /// Parser message
        reason: String,
    },

    /// Document has no root element, or the root is not the expected one
    #[error("Missing root element")]
    MissingRoot,

    /// An element or attribute holds an unusable value
    #[error("Invalid value for {element}: '{value}'")]
    InvalidValue {
        /// Element or attribute name
        element: String,
        /// Offending text
        value: String,
    },

    /// `<control type="...">` names a type the factory does not build
    #[error("Unknown control type: {0}")]
    UnknownControlType(String),

    /// No resolution folder contains the window file
    #[error("Window file not found in any resolution folder: {0}")]
    WindowNotFound(String),
}
