use qrcode::render::svg;
use qrcode::QrCode;
use serde::Serialize;

use crate::{EngineError, EngineResult};

/// QR-encoded verification link for a batch sticker.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyLink {
    pub url: String,
    #[serde(skip)]
    pub svg: String,
}

pub fn verify_url(base: &str, batch_id: &str) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}verify={batch_id}")
}

pub fn render_link(base: &str, batch_id: &str) -> EngineResult<VerifyLink> {
    let url = verify_url(base, batch_id);
    let code = QrCode::new(url.as_bytes()).map_err(|e| EngineError::Qr(e.to_string()))?;
    let svg = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .build();
    Ok(VerifyLink { url, svg })
}
