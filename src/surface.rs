use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use image::GrayImage;

use crate::error::SurfaceError;
use crate::types::Size;

/// A pixel rectangle on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// The rectangle covering a whole surface of `size`.
    pub const fn full(size: Size) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }
}

struct SurfaceInner {
    image: RwLock<GrayImage>,
    generation: AtomicU64,
}

/// Displayable 8-bit grayscale image of fixed dimensions.
///
/// Clones share the same pixels. Consumers read it whenever they like; the
/// producing stream replaces pixel rectangles under a write lock, so a
/// reader sees either the previous frame or the new one, never a mix.
#[derive(Clone)]
pub struct ImageSurface {
    inner: Arc<SurfaceInner>,
    size: Size,
}

impl ImageSurface {
    /// A black surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new(SurfaceInner {
                image: RwLock::new(GrayImage::new(width, height)),
                generation: AtomicU64::new(0),
            }),
            size: Size { width, height },
        }
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Number of completed writes. A UI can redraw whenever it changes.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Run `f` against the current image while holding the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&GrayImage) -> R) -> R {
        let image = self.inner.image.read().unwrap_or_else(PoisonError::into_inner);
        f(&image)
    }

    /// Copy of the current image.
    pub fn snapshot(&self) -> GrayImage {
        self.read(GrayImage::clone)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        Some(self.read(|image| image.get_pixel(x, y).0[0]))
    }

    /// Copy `pixels` into `rect`. Row `r` of the rectangle is read from
    /// `pixels[r * stride..r * stride + rect.width]`.
    pub(crate) fn write_pixels(
        &self,
        rect: Rect,
        pixels: &[u8],
        stride: usize,
    ) -> Result<(), SurfaceError> {
        let out_of_bounds = || SurfaceError::RectOutOfBounds {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            surface_width: self.size.width,
            surface_height: self.size.height,
        };
        let right = rect.x.checked_add(rect.width).ok_or_else(out_of_bounds)?;
        let bottom = rect.y.checked_add(rect.height).ok_or_else(out_of_bounds)?;
        if right > self.size.width || bottom > self.size.height {
            return Err(out_of_bounds());
        }

        let width = rect.width as usize;
        if stride < width {
            return Err(SurfaceError::StrideTooSmall {
                stride,
                width: rect.width,
            });
        }
        let rows = rect.height as usize;
        let needed = match rows {
            0 => 0,
            _ => stride * (rows - 1) + width,
        };
        if pixels.len() < needed {
            return Err(SurfaceError::BufferTooShort {
                needed,
                actual: pixels.len(),
            });
        }

        let surface_width = self.size.width as usize;
        {
            let mut image = self.inner.image.write().unwrap_or_else(PoisonError::into_inner);
            let dst: &mut [u8] = &mut image;
            if rect.x == 0 && width == surface_width && stride == width {
                let start = rect.y as usize * surface_width;
                dst[start..start + needed].copy_from_slice(&pixels[..needed]);
            } else {
                for row in 0..rows {
                    let src = &pixels[row * stride..row * stride + width];
                    let start = (rect.y as usize + row) * surface_width + rect.x as usize;
                    dst[start..start + width].copy_from_slice(src);
                }
            }
        }
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl std::fmt::Debug for ImageSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSurface")
            .field("size", &self.size)
            .field("generation", &self.generation())
            .finish()
    }
}
