//! Vendor type identifiers

use serde::{Deserialize, Serialize};

/// Structured vendor-type identifier used to select a recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorKind {
    /// Deterministic offline recognizer
    Mock,
    /// Replays previously captured transcripts
    Replay,
    Google,
    Microsoft,
    Deepgram,
    Tencent,
    Volcengine,
    Alibaba,
}

impl VendorKind {
    pub fn all() -> Vec<VendorKind> {
        vec![
            VendorKind::Mock,
            VendorKind::Replay,
            VendorKind::Google,
            VendorKind::Microsoft,
            VendorKind::Deepgram,
            VendorKind::Tencent,
            VendorKind::Volcengine,
            VendorKind::Alibaba,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VendorKind::Mock => "mock",
            VendorKind::Replay => "replay",
            VendorKind::Google => "google",
            VendorKind::Microsoft => "microsoft",
            VendorKind::Deepgram => "deepgram",
            VendorKind::Tencent => "tencent",
            VendorKind::Volcengine => "volcengine",
            VendorKind::Alibaba => "alibaba",
        }
    }
}

impl std::str::FromStr for VendorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" | "mockasr" => Ok(VendorKind::Mock),
            "replay" => Ok(VendorKind::Replay),
            "google" | "googlecloudasr" => Ok(VendorKind::Google),
            "microsoft" | "azure" | "microsoftasr" => Ok(VendorKind::Microsoft),
            "deepgram" | "deepgramasr" => Ok(VendorKind::Deepgram),
            "tencent" | "tencentasr" => Ok(VendorKind::Tencent),
            "volcengine" | "volcengineasr" => Ok(VendorKind::Volcengine),
            "alibaba" | "aliyun" | "alibabaasr" => Ok(VendorKind::Alibaba),
            _ => Err(format!("Unknown vendor kind: {}", s)),
        }
    }
}

impl std::fmt::Display for VendorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
