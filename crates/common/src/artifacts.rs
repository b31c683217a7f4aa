//! Artifact output: config files, the shared server peer script and QR codes

use image::{GrayImage, ImageFormat, Luma};
use parking_lot::Mutex;
use qrcode::render::unicode::Dense1x2;
use qrcode::{Color, QrCode};
use std::fs::OpenOptions;
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::render::RenderedArtifacts;

/// Shared server-side peer script inside the data directory
pub const SERVER_PEER_FILE: &str = "wg_server_peer_config.rsc";

/// Pixels per QR module in PNG output
const QR_SCALE: u32 = 8;
/// Quiet zone around the PNG code, in modules
const QR_BORDER: u32 = 4;

/// Where the artifacts of one issuance ended up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub windows: PathBuf,
    pub mikrotik: PathBuf,
    pub server_peer: PathBuf,
    pub qr_png: Option<PathBuf>,
}

/// Destination for rendered artifacts
pub trait ArtifactSink: Send + Sync {
    fn write(&self, identity: &str, artifacts: &RenderedArtifacts) -> io::Result<WrittenArtifacts>;
}

/// Writes artifacts as files in a data directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    qr_png: bool,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            qr_png: true,
        }
    }

    /// Enable or disable the PNG QR code
    pub fn with_qr_png(mut self, enabled: bool) -> Self {
        self.qr_png = enabled;
        self
    }

    pub fn windows_path(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{}_wg_windows.conf", identity))
    }

    pub fn mikrotik_path(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{}_wg_mt_setup.rsc", identity))
    }

    pub fn qr_path(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{}_wg_qr.png", identity))
    }

    pub fn server_peer_path(&self) -> PathBuf {
        self.dir.join(SERVER_PEER_FILE)
    }
}

impl ArtifactSink for DirectorySink {
    fn write(&self, identity: &str, artifacts: &RenderedArtifacts) -> io::Result<WrittenArtifacts> {
        std::fs::create_dir_all(&self.dir)?;

        let windows = self.windows_path(identity);
        write_private(&windows, artifacts.windows.as_bytes())?;

        let mikrotik = self.mikrotik_path(identity);
        write_private(&mikrotik, artifacts.mikrotik.as_bytes())?;

        let server_peer = self.server_peer_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&server_peer)?;
        writeln!(file, "{}", artifacts.server_peer)?;

        let qr_png = if self.qr_png {
            let path = self.qr_path(identity);
            write_private(&path, &qr_png(&artifacts.windows)?)?;
            Some(path)
        } else {
            None
        };

        debug!("Wrote artifacts for {} to {:?}", identity, self.dir);
        Ok(WrittenArtifacts {
            windows,
            mikrotik,
            server_peer,
            qr_png,
        })
    }
}

/// Client configs carry private keys; keep them owner-only
fn write_private(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    Ok(())
}

fn qr_code(payload: &str) -> io::Result<QrCode> {
    QrCode::new(payload.as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("QR encoding failed: {}", e)))
}

/// PNG image of a QR code encoding `payload`
pub fn qr_png(payload: &str) -> io::Result<Vec<u8>> {
    let code = qr_code(payload)?;
    let width = code.width() as u32;
    let colors = code.to_colors();
    let size = (width + 2 * QR_BORDER) * QR_SCALE;

    let img = GrayImage::from_fn(size, size, |x, y| {
        let (mx, my) = (x / QR_SCALE, y / QR_SCALE);
        let dark = mx >= QR_BORDER
            && my >= QR_BORDER
            && mx < width + QR_BORDER
            && my < width + QR_BORDER
            && colors[((my - QR_BORDER) * width + (mx - QR_BORDER)) as usize] == Color::Dark;
        if dark {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    });

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(out.into_inner())
}

/// QR code encoding `payload` as unicode half blocks for a terminal
pub fn qr_terminal(payload: &str) -> io::Result<String> {
    let code = qr_code(payload)?;
    Ok(code
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .build())
}

/// Collects artifacts in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    written: Mutex<Vec<(String, RenderedArtifacts)>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose writes always fail
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn written(&self) -> Vec<(String, RenderedArtifacts)> {
        self.written.lock().clone()
    }
}

impl ArtifactSink for MemorySink {
    fn write(&self, identity: &str, artifacts: &RenderedArtifacts) -> io::Result<WrittenArtifacts> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "artifact sink refused write"));
        }
        self.written
            .lock()
            .push((identity.to_string(), artifacts.clone()));
        Ok(WrittenArtifacts::default())
    }
}
