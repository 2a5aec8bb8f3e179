//! Image buffer types for source and composed frames.
//!
//! Every buffer in the core uses one packed 32-bit RGBA-family layout.
//! Rows are padded to a 64-byte stride so uploads and row-parallel passes
//! never straddle two rows.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Opaque identifier for one decoded media stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// Unique identifier of a pixel allocation.
///
/// A pooled allocation keeps its id across reuse, so two *live* buffers
/// never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BufferId(pub u64);

impl BufferId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Packed 32-bit pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGBA (32 bits per pixel)
    #[default]
    Rgba8,
    /// 8-bit BGRA (32 bits per pixel, VideoToolbox native)
    Bgra8,
}

impl PixelFormat {
    /// Bytes per pixel. Always 4 for the packed formats.
    pub const fn bytes_per_pixel(self) -> usize {
        4
    }

    /// Minimum stride in bytes for a row of `width` pixels, padded to 64 bytes.
    pub fn aligned_stride(self, width: u32) -> usize {
        let min_stride = width as usize * self.bytes_per_pixel();
        (min_stride + 63) & !63
    }

    /// Total bytes needed for a frame of this format.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        self.aligned_stride(width) * height as usize
    }
}

/// Storage sink for buffers that go back to a pool when dropped.
pub trait BufferRecycler: Send + Sync {
    /// Take back a buffer whose last owner dropped it.
    fn recycle(&self, buffer: ImageBuffer);
}

/// A 2D pixel surface in a packed 32-bit format.
pub struct ImageBuffer {
    id: BufferId,
    format: PixelFormat,
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
    recycler: Option<Weak<dyn BufferRecycler>>,
}

/// Arc-wrapped image for shared, read-only ownership.
pub type SharedImage = Arc<ImageBuffer>;

impl ImageBuffer {
    /// Create a transparent-black buffer.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let stride = format.aligned_stride(width);
        Self {
            id: BufferId::next(),
            format,
            width,
            height,
            stride,
            data: vec![0u8; stride * height as usize],
            recycler: None,
        }
    }

    /// Create a buffer filled with one color.
    pub fn filled(width: u32, height: u32, format: PixelFormat, color: [u8; 4]) -> Self {
        let mut buffer = Self::new(width, height, format);
        buffer.clear(color);
        buffer
    }

    /// Create a buffer by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(
        width: u32,
        height: u32,
        format: PixelFormat,
        mut f: impl FnMut(u32, u32) -> [u8; 4],
    ) -> Self {
        let mut buffer = Self::new(width, height, format);
        for y in 0..height {
            for (x, px) in buffer.row_pixels_mut(y).iter_mut().enumerate() {
                *px = f(x as u32, y);
            }
        }
        buffer
    }

    /// Create a buffer from tightly packed pixel bytes.
    pub fn from_packed(width: u32, height: u32, format: PixelFormat, bytes: &[u8]) -> Result<Self> {
        let row_bytes = width as usize * format.bytes_per_pixel();
        if bytes.len() != row_bytes * height as usize {
            return Err(CoreError::InvalidParameter(format!(
                "expected {} bytes for {}x{}, got {}",
                row_bytes * height as usize,
                width,
                height,
                bytes.len()
            )));
        }
        let mut buffer = Self::new(width, height, format);
        for (y, src) in bytes.chunks_exact(row_bytes.max(1)).enumerate() {
            buffer.row_mut(y as u32).copy_from_slice(src);
        }
        Ok(buffer)
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row, including padding.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Total memory usage of this buffer in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }

    /// Get a row of pixel data (padding excluded).
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        let end = start + self.width as usize * self.format.bytes_per_pixel();
        &self.data[start..end]
    }

    /// Get a mutable row of pixel data (padding excluded).
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let end = start + self.width as usize * self.format.bytes_per_pixel();
        &mut self.data[start..end]
    }

    /// A row viewed as whole pixels.
    #[inline]
    pub fn row_pixels(&self, y: u32) -> &[[u8; 4]] {
        bytemuck::cast_slice(self.row(y))
    }

    /// A mutable row viewed as whole pixels.
    #[inline]
    pub fn row_pixels_mut(&mut self, y: u32) -> &mut [[u8; 4]] {
        bytemuck::cast_slice_mut(self.row_mut(y))
    }

    /// Pixel at (x, y).
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.row_pixels(y)[x as usize]
    }

    /// The raw rows including stride padding, for row-parallel passes.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        self.data.chunks_exact_mut(self.stride.max(1))
    }

    /// Raw storage including stride padding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Raw mutable storage including stride padding.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Fill every pixel with one color.
    pub fn clear(&mut self, color: [u8; 4]) {
        for y in 0..self.height {
            self.row_pixels_mut(y).fill(color);
        }
    }

    /// Compare visible pixels, ignoring stride padding and identity.
    pub fn same_pixels(&self, other: &ImageBuffer) -> bool {
        self.format == other.format
            && self.width == other.width
            && self.height == other.height
            && (0..self.height).all(|y| self.row(y) == other.row(y))
    }

    /// Check that this buffer has the given dimensions and format.
    pub fn expect_layout(&self, width: u32, height: u32, format: PixelFormat) -> Result<()> {
        if self.format != format {
            return Err(CoreError::UnsupportedFormat(format!(
                "expected {:?}, got {:?}",
                format, self.format
            )));
        }
        if self.width != width || self.height != height {
            return Err(CoreError::DimensionMismatch {
                expected_width: width,
                expected_height: height,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Route this buffer's storage back to `recycler` when it is dropped.
    pub fn attach_recycler(&mut self, recycler: Weak<dyn BufferRecycler>) {
        self.recycler = Some(recycler);
    }
}

impl Clone for ImageBuffer {
    /// Copies pixels into a fresh, unpooled allocation with a new id.
    fn clone(&self) -> Self {
        Self {
            id: BufferId::next(),
            format: self.format,
            width: self.width,
            height: self.height,
            stride: self.stride,
            data: self.data.clone(),
            recycler: None,
        }
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("pooled", &self.recycler.is_some())
            .finish()
    }
}

impl Drop for ImageBuffer {
    fn drop(&mut self) {
        let Some(recycler) = self.recycler.take().and_then(|weak| weak.upgrade()) else {
            return;
        };
        recycler.recycle(ImageBuffer {
            id: self.id,
            format: self.format,
            width: self.width,
            height: self.height,
            stride: self.stride,
            data: std::mem::take(&mut self.data),
            recycler: None,
        });
    }
}
