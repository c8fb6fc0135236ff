pub mod codec;
pub mod ldap;

use std::collections::HashMap;
use thiserror::Error;

pub use ldap::{LdapConnector, LdapSettings};

/// Result code for a successful directory operation.
pub const SUCCESS: u32 = 0;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("cannot connect to directory endpoint {address}: {message}")]
    Connect { address: String, message: String },

    #[error("directory bind failed ({}, code {code}): {message}", code_text(.code))]
    Auth { code: u32, message: String },

    #[error(
        "directory search failed ({}, code {code}); base: {base_path}, filter: {filter}: {message}",
        code_text(.code)
    )]
    Search {
        code: u32,
        base_path: String,
        filter: String,
        message: String,
    },
}

impl DirectoryError {
    pub fn code(&self) -> Option<u32> {
        match self {
            DirectoryError::Connect { .. } => None,
            DirectoryError::Auth { code, .. } | DirectoryError::Search { code, .. } => Some(*code),
        }
    }
}

/// Opens connections to a directory endpoint.
pub trait DirectoryConnector: Send + Sync {
    fn connect(&self, address: &str) -> Result<Box<dyn DirectoryConnection>, DirectoryError>;
}

/// A single live directory connection. Dropping it releases the connection.
pub trait DirectoryConnection {
    /// Negotiated bind with the caller's ambient credentials.
    fn authenticate(&mut self) -> Result<(), DirectoryError>;

    /// Subtree search. A search matching nothing is an empty [`ResultSet`], not an error.
    fn search(
        &mut self,
        base_path: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<ResultSet, DirectoryError>;

    /// Result code of the most recent operation.
    fn last_error_code(&self) -> u32;

    fn last_error(&self) -> String {
        describe_last_error(self.last_error_code())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: &str) -> Self {
        Self {
            dn: dn.to_string(),
            attrs: HashMap::new(),
        }
    }

    pub fn with_values(mut self, name: &str, values: &[&str]) -> Self {
        self.attrs.insert(
            name.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Values of one attribute. Attribute names are case-insensitive.
    pub fn values(&self, name: &str) -> &[String] {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    entries: Vec<DirectoryEntry>,
}

impl ResultSet {
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every value of `name`, entry by entry then value by value.
    /// Entries lacking the attribute contribute nothing.
    pub fn attribute_values(&self, name: &str) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|entry| entry.values(name).iter().cloned())
            .collect()
    }
}

fn code_text(code: &u32) -> &'static str {
    match result_code_description(*code) {
        "" => "unrecognised result",
        description => description,
    }
}

pub fn describe_last_error(code: u32) -> String {
    if code == SUCCESS {
        return "No error".to_string();
    }
    match result_code_description(code) {
        "" => format!("Unknown error (code: {})", code),
        description => description.to_string(),
    }
}

/// RFC 4511 result codes plus the client-side codes reported by LDAP client libraries.
pub fn result_code_description(code: u32) -> &'static str {
    match code {
        0 => "Success",
        1 => "Operations Error",
        2 => "Protocol Error",
        3 => "Time Limit Exceeded",
        4 => "Size Limit Exceeded",
        7 => "Auth Method Not Supported",
        8 => "Strong Authentication Required",
        10 => "Referral",
        11 => "Admin Limit Exceeded",
        12 => "Unavailable Critical Extension",
        13 => "Confidentiality Required",
        14 => "SASL Bind In Progress",
        16 => "No Such Attribute",
        17 => "Undefined Attribute Type",
        18 => "Inappropriate Matching",
        32 => "No Such Object",
        34 => "Invalid DN Syntax",
        48 => "Inappropriate Authentication",
        49 => "Invalid Credentials",
        50 => "Insufficient Rights",
        51 => "Busy",
        52 => "Unavailable",
        53 => "Unwilling To Perform",
        80 => "Other",
        81 => "Server Down",
        82 => "Local Error",
        83 => "Encoding Error",
        84 => "Decoding Error",
        85 => "Timeout",
        86 => "Auth Unknown",
        87 => "Filter Error",
        89 => "Parameter Error",
        90 => "No Memory",
        91 => "Connect Error",
        _ => "",
    }
}
