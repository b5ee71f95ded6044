//! Content document types
//!
//! A portfolio is made of four named documents. Each document is a
//! schema-less JSON value; its shape is owned by whoever renders it.
//! This module defines the closed set of document types, the names they
//! are stored under, and the built-in defaults returned when nothing has
//! been saved anywhere.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// A content document payload
pub type ContentDocument = Value;

/// Error returned when parsing an unknown document type name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown document type '{0}'. Valid types: projects, skills, about, settings")]
pub struct UnknownDocumentType(pub String);

/// The fixed set of content documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Projects,
    Skills,
    About,
    Settings,
}

impl DocumentType {
    /// All document types, in display order
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Projects,
        DocumentType::Skills,
        DocumentType::About,
        DocumentType::Settings,
    ];

    /// Lowercase name used in paths and remote records
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Projects => "projects",
            DocumentType::Skills => "skills",
            DocumentType::About => "about",
            DocumentType::Settings => "settings",
        }
    }

    /// Key the document is mirrored under in the local cache
    ///
    /// `portfolio` followed by the capitalized type name, e.g. `portfolioSkills`.
    pub fn cache_key(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("portfolio{}{}", first.to_ascii_uppercase(), chars.as_str()),
            None => "portfolio".to_string(),
        }
    }

    /// Path of the document inside a remote content repository
    pub fn content_path(&self) -> String {
        let name = self.as_str();
        format!("content/{}/{}.json", name, name)
    }

    /// Built-in document returned when no backend has a value
    pub fn default_document(&self) -> ContentDocument {
        match self {
            DocumentType::Projects => json!([
                {
                    "id": 1,
                    "title": "E-Commerce Platform",
                    "description": "A modern e-commerce platform with real-time inventory and secure payments",
                    "image": "https://picsum.photos/seed/ecommerce/500/300.jpg",
                    "technologies": ["React", "Node.js", "MongoDB", "Stripe"],
                    "liveUrl": "https://example.com",
                    "githubUrl": "https://github.com"
                }
            ]),
            DocumentType::Skills => json!([
                {
                    "id": 1,
                    "name": "JavaScript",
                    "icon": "fab fa-js",
                    "level": 90,
                    "color": "#F7DF1E",
                    "category": "Frontend"
                }
            ]),
            DocumentType::About => json!({
                "name": "MD. RAJIN SHAHRIAR",
                "tagline": "Passionate Web Developer & Tech Entrepreneur",
                "image": "https://via.placeholder.com/400x500/667eea/ffffff?text=MD.+RAJIN+SHAHRIAR",
                "description": "Building modern, responsive, and user-friendly web experiences",
                "info": [
                    {
                        "icon": "fa-graduation-cap",
                        "title": "Education",
                        "content": "BSc in Computer Science & Engineering"
                    },
                    {
                        "icon": "fa-briefcase",
                        "title": "Professional",
                        "content": "Founder & CEO at Devlify App"
                    }
                ]
            }),
            DocumentType::Settings => json!({
                "siteTitle": "Rajin's Portfolio",
                "siteDescription": "Professional web developer portfolio showcasing modern web development projects",
                "authorName": "MD. RAJIN SHAHRIAR",
                "heroTitle": "RAJIN SHAHRIAR",
                "heroSubtitle": "Building modern, responsive, and user-friendly web experiences",
                "email": "hello@example.com",
                "phone": "+1 (555) 123-4567",
                "location": "San Francisco, CA"
            }),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = UnknownDocumentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| UnknownDocumentType(s.to_string()))
    }
}

/// Whether a value carries no content (null, empty array, empty object)
///
/// Remote records are seeded with empty placeholders; those count as absent.
pub fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
