//! Per-run accumulator for streamed text and rendered artifacts.

use anyhow::{Context, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFragment {
    pub stream: Stream,
    pub text: String,
}

/// Opaque reference to a rendered visual (base64 payload plus mime type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub mime: String,
    pub data: String,
}

impl ArtifactRef {
    pub fn png(data: impl Into<String>) -> Self {
        Self { mime: "image/png".into(), data: data.into() }
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data.as_bytes())
            .with_context(|| format!("invalid base64 payload for {} artifact", self.mime))
    }

    pub fn extension(&self) -> &str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/svg+xml" => "svg",
            "image/jpeg" => "jpg",
            _ => "bin",
        }
    }
}

/// Forwarded to a live listener as each piece of output arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Text { stream: Stream, text: String },
    Artifact(ArtifactRef),
}

#[derive(Debug, Default)]
pub struct OutputSink {
    fragments: Vec<TextFragment>,
    artifacts: Vec<ArtifactRef>,
    listener: Option<UnboundedSender<OutputEvent>>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(listener: UnboundedSender<OutputEvent>) -> Self {
        Self { listener: Some(listener), ..Self::default() }
    }

    pub fn append_text(&mut self, stream: Stream, fragment: impl Into<String>) {
        let text = fragment.into();
        if text.is_empty() {
            return;
        }
        if let Some(tx) = &self.listener {
            // A listener that went away just stops receiving.
            let _ = tx.send(OutputEvent::Text { stream, text: text.clone() });
        }
        self.fragments.push(TextFragment { stream, text });
    }

    pub fn append_artifact(&mut self, artifact: ArtifactRef) {
        if let Some(tx) = &self.listener {
            let _ = tx.send(OutputEvent::Artifact(artifact.clone()));
        }
        self.artifacts.push(artifact);
    }

    pub fn fragments(&self) -> &[TextFragment] {
        &self.fragments
    }

    pub fn artifacts(&self) -> &[ArtifactRef] {
        &self.artifacts
    }

    /// All text fragments in arrival order.
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.artifacts.is_empty()
    }

    /// Consume the sink, dropping the listener and keeping the captured data.
    pub fn finish(self) -> (String, Vec<ArtifactRef>) {
        let text = self.text();
        (text, self.artifacts)
    }
}
