use std::{fmt, ops::Deref};

use serde::Deserialize;

/// Opaque identifier of a video on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaId(String);

impl MediaId {
    pub const WATCH_URL: &'static str = "https://www.youtube.com/watch";

    pub fn new(id: impl Into<String>) -> Self {
        MediaId(id.into())
    }

    pub fn watch_url(&self) -> String {
        format!("{}?v={}", Self::WATCH_URL, self.0)
    }
}

impl Deref for MediaId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body returned by the download API.
///
/// Every field is optional and `null` is treated like a missing key.
#[derive(Debug, Default, Deserialize)]
pub struct StreamsResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub streams: Option<Vec<StreamDescriptor>>,
}

impl StreamsResponse {
    /// Reads the body field by field so one malformed stream entry does not
    /// hide the failure message or the other streams.
    pub fn from_value(body: &serde_json::Value) -> Self {
        let message = body
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);

        let streams = body
            .get("streams")
            .and_then(serde_json::Value::as_array)
            .map(|streams| {
                streams
                    .iter()
                    .filter_map(|stream| StreamDescriptor::deserialize(stream).ok())
                    .collect()
            });

        StreamsResponse { message, streams }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamDescriptor {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}
