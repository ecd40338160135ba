//! Per-file change flags reported by snapper comparisons
//!
//! The daemon sends a bit set per file. The textual form mirrors what the
//! snapper command line prints: one character for the kind of change
//! followed by one character per metadata change.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bit set of changes between two versions of a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct FileStatus(u32);

impl FileStatus {
    pub const CREATED: u32 = 1;
    pub const DELETED: u32 = 2;
    pub const TYPE: u32 = 4;
    pub const CONTENT: u32 = 8;
    pub const PERMISSIONS: u32 = 16;
    pub const USER: u32 = 32;
    pub const GROUP: u32 = 64;
    pub const XATTRS: u32 = 128;
    pub const ACL: u32 = 256;

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn is_created(&self) -> bool {
        self.contains(Self::CREATED)
    }

    pub fn is_deleted(&self) -> bool {
        self.contains(Self::DELETED)
    }

    /// Parse the textual form, e.g. `"+..."` or `"cpug"`
    ///
    /// ```
    /// use snapview_common::FileStatus;
    /// let status = FileStatus::parse("c.u.").unwrap();
    /// assert!(status.contains(FileStatus::CONTENT));
    /// assert!(status.contains(FileStatus::USER));
    /// ```
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut chars = text.chars();
        let mut bits = match chars.next() {
            Some('+') => Self::CREATED,
            Some('-') => Self::DELETED,
            Some('t') => Self::TYPE,
            Some('c') => Self::CONTENT,
            Some('.') => 0,
            Some(other) => return Err(format!("Unknown change kind '{other}'")),
            None => return Err("Empty status string".to_string()),
        };

        let metadata = [
            ('p', Self::PERMISSIONS),
            ('u', Self::USER),
            ('g', Self::GROUP),
            ('x', Self::XATTRS),
            ('a', Self::ACL),
        ];

        for (c, (expected, flag)) in chars.zip(metadata.iter()) {
            if c == *expected {
                bits |= flag;
            } else if c != '.' {
                return Err(format!("Unexpected '{c}' in status '{text}'"));
            }
        }

        Ok(Self(bits))
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.contains(Self::CREATED) {
            '+'
        } else if self.contains(Self::DELETED) {
            '-'
        } else if self.contains(Self::TYPE) {
            't'
        } else if self.contains(Self::CONTENT) {
            'c'
        } else {
            '.'
        };

        let flag = |bit: u32, c: char| if self.contains(bit) { c } else { '.' };

        write!(
            f,
            "{kind}{}{}{}",
            flag(Self::PERMISSIONS, 'p'),
            flag(Self::USER, 'u'),
            flag(Self::GROUP, 'g'),
        )?;

        // Extended attributes and ACLs only show up when present
        if self.contains(Self::XATTRS) || self.contains(Self::ACL) {
            write!(f, "{}{}", flag(Self::XATTRS, 'x'), flag(Self::ACL, 'a'))?;
        }

        Ok(())
    }
}

impl From<FileStatus> for String {
    fn from(status: FileStatus) -> Self {
        status.to_string()
    }
}

impl TryFrom<String> for FileStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FileStatus::parse(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(FileStatus::from_bits(FileStatus::CREATED).to_string(), "+...");
        assert_eq!(FileStatus::from_bits(FileStatus::DELETED).to_string(), "-...");
        assert_eq!(
            FileStatus::from_bits(FileStatus::CONTENT | FileStatus::GROUP).to_string(),
            "c..g"
        );
        assert_eq!(
            FileStatus::from_bits(
                FileStatus::TYPE | FileStatus::PERMISSIONS | FileStatus::USER | FileStatus::GROUP
            )
            .to_string(),
            "tpug"
        );
        assert_eq!(FileStatus::from_bits(FileStatus::PERMISSIONS).to_string(), ".p..");
        assert_eq!(
            FileStatus::from_bits(FileStatus::CONTENT | FileStatus::ACL).to_string(),
            "c....a"
        );
    }

    #[test]
    fn test_created_wins_over_other_kinds() {
        let status = FileStatus::from_bits(FileStatus::CREATED | FileStatus::CONTENT);
        assert_eq!(status.to_string(), "+...");
        assert!(status.is_created());
        assert!(!status.is_deleted());
    }

    #[test]
    fn test_parse() {
        assert_eq!(FileStatus::parse("+...").unwrap().bits(), FileStatus::CREATED);
        assert_eq!(
            FileStatus::parse(".pu.").unwrap().bits(),
            FileStatus::PERMISSIONS | FileStatus::USER
        );
        assert_eq!(
            FileStatus::parse("c...xa").unwrap().bits(),
            FileStatus::CONTENT | FileStatus::XATTRS | FileStatus::ACL
        );
        assert!(FileStatus::parse("").is_err());
        assert!(FileStatus::parse("?...").is_err());
        assert!(FileStatus::parse("cz..").is_err());
    }

    #[test]
    fn test_serde_uses_text_form() {
        let status = FileStatus::from_bits(FileStatus::CONTENT | FileStatus::USER);
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"c.u.\"");
        let back: FileStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }
}
