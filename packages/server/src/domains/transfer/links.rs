//! Share link recognition.
//!
//! Maps a public share URL to the drive service it belongs to and the share
//! id embedded in its path. Recognition is host-based; the share id is the
//! path segment after `/s/`, with query strings and fragments stripped.

use crate::kernel::traits::DriveService;

const HOST_PATTERNS: &[(&str, DriveService)] = &[
    ("pan.xunlei.com", DriveService::Xunlei),
    ("pan.quark.cn", DriveService::Quark),
    ("www.alipan.com", DriveService::Alipan),
    ("www.aliyundrive.com", DriveService::Alipan),
    ("pan.baidu.com", DriveService::Baidu),
    ("drive.uc.cn", DriveService::Uc),
    ("fast.uc.cn", DriveService::Uc),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub service: DriveService,
    pub share_id: String,
}

/// Which drive service a URL points at, if any.
pub fn detect_service(url: &str) -> Option<DriveService> {
    let url = url.to_lowercase();
    HOST_PATTERNS
        .iter()
        .find(|(host, _)| url.contains(host))
        .map(|(_, service)| *service)
}

/// Parse a share URL into its service and share id.
pub fn parse_share_link(url: &str) -> Option<ShareLink> {
    let service = detect_service(url)?;

    // Everything after '?' or '#' is tracking/anchor noise.
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url);

    let start = path.find("/s/")? + 3;
    let share_id = path[start..].trim_matches('/');
    if share_id.is_empty() || share_id.contains('/') {
        return None;
    }

    Some(ShareLink {
        service,
        share_id: share_id.to_string(),
    })
}
