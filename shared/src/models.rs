/// Wire models shared between the Relay API and its upstream platform client.
use serde::{Deserialize, Serialize};

/// A media file discovered inside an extracted bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedFile {
    pub filename: String,
    /// Path under the static `/extracted/` prefix.
    pub url: String,
}

/// Client role granted by a connection token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Publisher,
    Subscriber,
    Moderator,
    #[serde(rename = "publisheronly")]
    PublisherOnly,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Publisher => write!(f, "publisher"),
            Role::Subscriber => write!(f, "subscriber"),
            Role::Moderator => write!(f, "moderator"),
            Role::PublisherOnly => write!(f, "publisheronly"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "publisher" => Ok(Role::Publisher),
            "subscriber" => Ok(Role::Subscriber),
            "moderator" => Ok(Role::Moderator),
            "publisheronly" => Ok(Role::PublisherOnly),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// How the platform records the streams of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One mixed file for the whole session.
    Composed,
    /// One file per stream, delivered as a zip bundle.
    Individual,
}

/// Body of an archive start request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveOptions {
    pub session_id: String,
    pub name: String,
    pub has_audio: bool,
    pub has_video: bool,
    pub output_mode: OutputMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<serde_json::Value>,
}

impl ArchiveOptions {
    pub fn audio_only(session_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            name: name.into(),
            has_audio: true,
            has_video: false,
            output_mode: OutputMode::Composed,
            resolution: None,
            layout: None,
        }
    }

    pub fn composed(session_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            has_video: true,
            ..Self::audio_only(session_id, name)
        }
    }

    pub fn individual(session_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            output_mode: OutputMode::Individual,
            ..Self::composed(session_id, name)
        }
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    pub fn with_layout(mut self, layout: Option<serde_json::Value>) -> Self {
        self.layout = layout;
        self
    }
}

/// Body of an experience composer render start request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub session_id: String,
    pub token: String,
    pub url: String,
    pub max_duration: u32,
    pub resolution: String,
    pub properties: RenderProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderProperties {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Moderator".parse::<Role>().unwrap(), Role::Moderator);
        assert_eq!("publisheronly".parse::<Role>().unwrap(), Role::PublisherOnly);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::default().to_string(), "publisher");
    }

    #[test]
    fn test_individual_archive_body() {
        let opts = ArchiveOptions::individual("sess-1", "Individual Archive");
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["sessionId"], "sess-1");
        assert_eq!(json["outputMode"], "individual");
        assert_eq!(json["hasVideo"], true);
        assert!(json.get("resolution").is_none());
    }

    #[test]
    fn test_audio_only_archive_body() {
        let json = serde_json::to_value(ArchiveOptions::audio_only("s", "a")).unwrap();
        assert_eq!(json["hasAudio"], true);
        assert_eq!(json["hasVideo"], false);
        assert_eq!(json["outputMode"], "composed");
    }
}
