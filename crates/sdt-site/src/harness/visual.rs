//! Snapshot comparison and storage.
//!
//! Snapshots live at `<snapshot_dir>/<profile>/<prefix>-<scene>.png`; diff
//! images for failed comparisons go to `<diff_dir>/<profile>/` with a
//! `_diff` suffix.

use crate::raster::encode_png;
use crate::result::{SiteError, SiteResult};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default share of pixels allowed to differ
pub const DEFAULT_MAX_DIFF_PIXEL_RATIO: f64 = 0.01;

/// Default per-pixel tolerance (sum of RGB channel differences)
pub const DEFAULT_COLOR_THRESHOLD: u8 = 10;

const DIFF_HIGHLIGHT: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Comparison tolerances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Share of pixels (0.0-1.0) allowed to differ
    pub max_diff_pixel_ratio: f64,
    /// Channel-sum difference above which a pixel counts as different
    pub color_threshold: u8,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            max_diff_pixel_ratio: DEFAULT_MAX_DIFF_PIXEL_RATIO,
            color_threshold: DEFAULT_COLOR_THRESHOLD,
        }
    }
}

impl CompareConfig {
    /// Set the allowed ratio
    #[must_use]
    pub const fn with_max_diff_pixel_ratio(mut self, ratio: f64) -> Self {
        self.max_diff_pixel_ratio = ratio;
        self
    }

    /// Set the per-pixel tolerance
    #[must_use]
    pub const fn with_color_threshold(mut self, threshold: u8) -> Self {
        self.color_threshold = threshold;
        self
    }
}

/// Outcome of comparing a capture with a stored snapshot
#[derive(Debug, Clone)]
pub struct ImageDiff {
    /// Within tolerance
    pub matches: bool,
    /// Pixels over the color threshold
    pub diff_pixel_count: usize,
    /// Pixels compared
    pub total_pixels: usize,
    /// `diff_pixel_count / total_pixels`
    pub diff_ratio: f64,
    /// Largest per-pixel difference
    pub max_color_diff: u32,
    /// Mean difference over differing pixels
    pub avg_color_diff: f64,
    /// PNG highlighting differing pixels, present when not matching
    pub diff_image: Option<Vec<u8>>,
}

impl ImageDiff {
    /// No pixel over the threshold
    #[must_use]
    pub const fn is_identical(&self) -> bool {
        self.diff_pixel_count == 0
    }
}

/// Pixel comparator
#[derive(Debug, Clone, Default)]
pub struct SnapshotComparator {
    config: CompareConfig,
}

impl SnapshotComparator {
    /// Comparator with `config`
    #[must_use]
    pub const fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    /// Tolerances in use
    #[must_use]
    pub const fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Compare two PNGs.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::ImageComparison`] when either image fails to
    /// decode or the dimensions differ.
    pub fn compare(&self, actual: &[u8], expected: &[u8]) -> SiteResult<ImageDiff> {
        let actual = decode(actual, "actual")?;
        let expected = decode(expected, "expected")?;
        self.compare_rgba(&actual, &expected)
    }

    /// Compare two decoded images.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::ImageComparison`] when the dimensions differ or
    /// the diff image cannot be encoded.
    pub fn compare_rgba(&self, actual: &RgbaImage, expected: &RgbaImage) -> SiteResult<ImageDiff> {
        if actual.dimensions() != expected.dimensions() {
            let (aw, ah) = actual.dimensions();
            let (ew, eh) = expected.dimensions();
            return Err(SiteError::ImageComparison {
                message: format!("size mismatch: captured {aw}x{ah}, stored {ew}x{eh}"),
            });
        }

        let threshold = u32::from(self.config.color_threshold);
        let (width, height) = actual.dimensions();
        let mut overlay = RgbaImage::new(width, height);
        let mut diff_pixel_count = 0usize;
        let mut max_color_diff = 0u32;
        let mut sum: u64 = 0;

        let pairs = actual.pixels().zip(expected.pixels());
        for (out, (a, e)) in overlay.pixels_mut().zip(pairs) {
            let d = pixel_diff(*a, *e);
            if d > threshold {
                diff_pixel_count += 1;
                sum += u64::from(d);
                max_color_diff = max_color_diff.max(d);
                *out = DIFF_HIGHLIGHT;
            } else {
                let Rgba([r, g, b, _]) = *a;
                *out = Rgba([r / 2, g / 2, b / 2, 128]);
            }
        }

        let total_pixels = (width as usize) * (height as usize);
        let diff_ratio = if total_pixels == 0 {
            0.0
        } else {
            diff_pixel_count as f64 / total_pixels as f64
        };
        let avg_color_diff = if diff_pixel_count == 0 {
            0.0
        } else {
            sum as f64 / diff_pixel_count as f64
        };
        let matches = diff_ratio <= self.config.max_diff_pixel_ratio;
        let diff_image = if matches {
            None
        } else {
            Some(encode_png(&overlay)?)
        };

        Ok(ImageDiff {
            matches,
            diff_pixel_count,
            total_pixels,
            diff_ratio,
            max_color_diff,
            avg_color_diff,
            diff_image,
        })
    }
}

fn decode(png: &[u8], which: &str) -> SiteResult<RgbaImage> {
    image::load_from_memory(png)
        .map(|img| img.to_rgba8())
        .map_err(|e| SiteError::ImageComparison {
            message: format!("cannot decode {which} image: {e}"),
        })
}

/// Sum of absolute RGB channel differences; alpha is ignored
#[must_use]
pub fn pixel_diff(a: Rgba<u8>, b: Rgba<u8>) -> u32 {
    a.0.iter()
        .zip(b.0.iter())
        .take(3)
        .map(|(x, y)| u32::from(x.abs_diff(*y)))
        .sum()
}

/// Hex SHA-256 of snapshot bytes
#[must_use]
pub fn digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

// =============================================================================
// STORE
// =============================================================================

/// Snapshot files on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotStore {
    snapshot_dir: PathBuf,
    diff_dir: PathBuf,
}

impl SnapshotStore {
    /// Store rooted at `snapshot_dir`, writing diffs under `diff_dir`
    #[must_use]
    pub fn new(snapshot_dir: impl Into<PathBuf>, diff_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
            diff_dir: diff_dir.into(),
        }
    }

    /// Snapshot root
    #[must_use]
    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    /// Diff root
    #[must_use]
    pub fn diff_dir(&self) -> &Path {
        &self.diff_dir
    }

    /// Path of snapshot `file_name` for `profile`
    #[must_use]
    pub fn path(&self, profile: &str, file_name: &str) -> PathBuf {
        self.snapshot_dir.join(profile).join(file_name)
    }

    /// Path of the diff image for snapshot `file_name`
    #[must_use]
    pub fn diff_path(&self, profile: &str, file_name: &str) -> PathBuf {
        let stem = file_name.strip_suffix(".png").unwrap_or(file_name);
        self.diff_dir.join(profile).join(format!("{stem}_diff.png"))
    }

    /// Whether the snapshot exists
    #[must_use]
    pub fn exists(&self, profile: &str, file_name: &str) -> bool {
        self.path(profile, file_name).is_file()
    }

    /// Read a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::SnapshotMissing`] when there is no such file.
    pub fn read(&self, profile: &str, file_name: &str) -> SiteResult<Vec<u8>> {
        let path = self.path(profile, file_name);
        if !path.is_file() {
            return Err(SiteError::SnapshotMissing {
                path: path.display().to_string(),
            });
        }
        Ok(std::fs::read(path)?)
    }

    /// Write a snapshot, creating directories as needed.
    ///
    /// # Errors
    ///
    /// Returns I/O errors.
    pub fn write(&self, profile: &str, file_name: &str, png: &[u8]) -> SiteResult<PathBuf> {
        let path = self.path(profile, file_name);
        write_file(&path, png)?;
        debug!(path = %path.display(), digest = %digest(png), "snapshot written");
        Ok(path)
    }

    /// Write a diff image.
    ///
    /// # Errors
    ///
    /// Returns I/O errors.
    pub fn write_diff(&self, profile: &str, file_name: &str, png: &[u8]) -> SiteResult<PathBuf> {
        let path = self.diff_path(profile, file_name);
        write_file(&path, png)?;
        debug!(path = %path.display(), "diff written");
        Ok(path)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> SiteResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    fn png(img: &RgbaImage) -> Vec<u8> {
        encode_png(img).unwrap()
    }

    #[test]
    fn test_identical_images_match() {
        let img = png(&solid(8, 8, [10, 20, 30, 255]));
        let diff = SnapshotComparator::default().compare(&img, &img).unwrap();
        assert!(diff.matches);
        assert!(diff.is_identical());
        assert!(diff.diff_image.is_none());
        assert_eq!(diff.total_pixels, 64);
    }

    #[test]
    fn test_small_color_drift_is_tolerated() {
        let a = solid(4, 4, [100, 100, 100, 255]);
        let b = solid(4, 4, [103, 103, 103, 255]);
        let diff = SnapshotComparator::default().compare_rgba(&a, &b).unwrap();
        assert!(diff.is_identical());
        assert_eq!(pixel_diff(Rgba([100, 100, 100, 0]), Rgba([103, 103, 103, 255])), 9);
    }

    #[test]
    fn test_ratio_over_limit_produces_diff_image() {
        let a = solid(10, 10, [255, 255, 255, 255]);
        let mut b = a.clone();
        for x in 0..10 {
            b.put_pixel(x, 0, Rgba([0, 0, 0, 255]));
        }
        let diff = SnapshotComparator::default().compare_rgba(&a, &b).unwrap();
        assert!(!diff.matches);
        assert_eq!(diff.diff_pixel_count, 10);
        assert!((diff.diff_ratio - 0.1).abs() < 1e-9);
        assert_eq!(diff.max_color_diff, 765);
        let overlay = image::load_from_memory(&diff.diff_image.unwrap()).unwrap().to_rgba8();
        assert_eq!(*overlay.get_pixel(3, 0), DIFF_HIGHLIGHT);
        assert_eq!(*overlay.get_pixel(3, 5), Rgba([127, 127, 127, 128]));

        let lenient = CompareConfig::default().with_max_diff_pixel_ratio(0.2);
        let diff = SnapshotComparator::new(lenient).compare_rgba(&a, &b).unwrap();
        assert!(diff.matches);
    }

    #[test]
    fn test_size_mismatch_is_an_error() {
        let a = png(&solid(4, 4, [0, 0, 0, 255]));
        let b = png(&solid(4, 5, [0, 0, 0, 255]));
        let err = SnapshotComparator::default().compare(&a, &b);
        assert!(matches!(err, Err(SiteError::ImageComparison { .. })));
        let err = SnapshotComparator::default().compare(b"not a png", &b);
        assert!(matches!(err, Err(SiteError::ImageComparison { .. })));
    }

    #[test]
    fn test_store_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snaps"), dir.path().join("diffs"));
        assert!(!store.exists("phone", "baseline-hero.png"));
        let err = store.read("phone", "baseline-hero.png");
        assert!(matches!(err, Err(SiteError::SnapshotMissing { .. })));

        let bytes = png(&solid(2, 2, [1, 2, 3, 255]));
        let path = store.write("phone", "baseline-hero.png", &bytes).unwrap();
        assert!(path.ends_with("snaps/phone/baseline-hero.png"));
        assert_eq!(store.read("phone", "baseline-hero.png").unwrap(), bytes);

        let diff = store.write_diff("phone", "current-hero.png", &bytes).unwrap();
        assert!(diff.ends_with("diffs/phone/current-hero_diff.png"));
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let d = digest(b"abc");
        assert_eq!(d.len(), 64);
        assert!(d.starts_with("ba7816bf"));
    }

    proptest! {
        #[test]
        fn prop_pixel_diff_symmetric(a in any::<[u8; 4]>(), b in any::<[u8; 4]>()) {
            prop_assert_eq!(pixel_diff(Rgba(a), Rgba(b)), pixel_diff(Rgba(b), Rgba(a)));
            prop_assert!(pixel_diff(Rgba(a), Rgba(b)) <= 765);
        }
    }
}
