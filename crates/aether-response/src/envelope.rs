//! Response envelopes.

use serde_json::Value;

use crate::sink::{DrawTarget, ResponseError};
use crate::xml::to_xml;

/// Content type of text responses unless overridden.
pub const TEXT_CONTENT_TYPE: &str = "text/html; charset=UTF-8";
/// Content type of JSON responses.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
/// Content type of XML responses.
pub const XML_CONTENT_TYPE: &str = "text/xml; charset=UTF-8";

/// Plain text or markup body.
#[derive(Debug, Clone, PartialEq)]
pub struct TextResponse {
    body: String,
    content_type: String,
}

/// Structured body serialized as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    value: Value,
}

/// Structured body serialized as an XML element tree.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlResponse {
    value: Value,
}

/// Output of a page, a service call or a standalone module render.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    Text(TextResponse),
    Json(JsonResponse),
    Xml(XmlResponse),
}

impl ResponseEnvelope {
    /// Create a text envelope.
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(TextResponse {
            body: body.into(),
            content_type: TEXT_CONTENT_TYPE.to_string(),
        })
    }

    /// Create a JSON envelope.
    pub fn json(value: impl Into<Value>) -> Self {
        Self::Json(JsonResponse {
            value: value.into(),
        })
    }

    /// Create an XML envelope.
    pub fn xml(value: impl Into<Value>) -> Self {
        Self::Xml(XmlResponse {
            value: value.into(),
        })
    }

    /// Override the content type of a text envelope.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        if let Self::Text(text) = &mut self {
            text.content_type = content_type.into();
        }
        self
    }

    /// Content type `draw` announces, if any.
    ///
    /// A JSON envelope holding `null` announces none.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.content_type.as_str()),
            Self::Json(json) if json.value.is_null() => None,
            Self::Json(_) => Some(JSON_CONTENT_TYPE),
            Self::Xml(_) => Some(XML_CONTENT_TYPE),
        }
    }

    /// Serialized representation, without touching any headers.
    pub fn get(&self) -> Result<String, ResponseError> {
        match self {
            Self::Text(text) => Ok(text.body.clone()),
            Self::Json(json) => Ok(serde_json::to_string(&json.value)?),
            Self::Xml(xml) => Ok(to_xml(&xml.value)),
        }
    }

    /// Structured payload of JSON and XML envelopes.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Text(_) => None,
            Self::Json(json) => Some(&json.value),
            Self::Xml(xml) => Some(&xml.value),
        }
    }

    /// Write the content type and the serialized body.
    ///
    /// The content type is skipped when the target already sent its headers.
    pub fn draw(&self, target: &mut dyn DrawTarget) -> Result<(), ResponseError> {
        let body = self.get()?;
        if let Some(content_type) = self.content_type() {
            if !target.headers_sent() {
                target.set_header("Content-Type", content_type)?;
            }
        }
        target.write_body(body.as_bytes())
    }
}
