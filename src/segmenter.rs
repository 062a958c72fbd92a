//! Background removal as an explicitly owned, lazily initialized resource.
//!
//! Segmentation models are expensive to load, so the handle defers
//! construction until first use and lets the owner drop the instance when
//! it is no longer needed. Nothing here is global: the orchestration layer
//! owns the handle and decides its lifetime.

use image::RgbaImage;

use crate::error::Result;

/// A black-box background remover.
pub trait Segmenter {
    /// Return `raster` with its background made transparent.
    ///
    /// # Errors
    ///
    /// Implementations report failures as
    /// [`Error::Segmentation`](crate::Error::Segmentation).
    fn segment(&self, raster: &RgbaImage) -> Result<RgbaImage>;
}

/// Lazily constructed [`Segmenter`] with an explicit dispose step.
pub struct SegmenterHandle<S, F>
where
    F: FnMut() -> Result<S>,
{
    factory: F,
    instance: Option<S>,
}

impl<S, F> SegmenterHandle<S, F>
where
    S: Segmenter,
    F: FnMut() -> Result<S>,
{
    /// Create a handle; `factory` runs on the first [`get`](Self::get).
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            instance: None,
        }
    }

    /// Borrow the segmenter, constructing it if needed.
    ///
    /// # Errors
    ///
    /// Propagates any error from the factory. A failed construction leaves
    /// the handle uninitialized so a later call can retry.
    pub fn get(&mut self) -> Result<&S> {
        let instance = match self.instance.take() {
            Some(instance) => instance,
            None => {
                log::info!("initializing background segmenter");
                (self.factory)()?
            }
        };
        Ok(self.instance.insert(instance))
    }

    /// Whether the segmenter is currently constructed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.instance.is_some()
    }

    /// Drop the segmenter. The next [`get`](Self::get) rebuilds it.
    pub fn dispose(&mut self) {
        if self.instance.take().is_some() {
            log::info!("disposed background segmenter");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use image::Rgba;

    struct ClearWhite;

    impl Segmenter for ClearWhite {
        fn segment(&self, raster: &RgbaImage) -> Result<RgbaImage> {
            let mut out = raster.clone();
            for px in out.pixels_mut() {
                if px.0[..3] == [255, 255, 255] {
                    *px = Rgba([0, 0, 0, 0]);
                }
            }
            Ok(out)
        }
    }

    #[test]
    fn handle_initializes_lazily_and_disposes() {
        let mut builds = 0;
        let mut handle = SegmenterHandle::new(|| {
            builds += 1;
            Ok(ClearWhite)
        });
        assert!(!handle.is_initialized());

        let img = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let out = handle.get().unwrap().segment(&img).unwrap();
        assert!(out.pixels().all(|p| p[3] == 0));
        assert!(handle.is_initialized());

        handle.get().unwrap();
        handle.dispose();
        assert!(!handle.is_initialized());
        handle.get().unwrap();
        drop(handle);
        assert_eq!(builds, 2);
    }

    #[test]
    fn failed_factory_can_retry() {
        let mut attempts = 0;
        let mut handle = SegmenterHandle::new(|| {
            attempts += 1;
            if attempts == 1 {
                Err(Error::Segmentation("model missing".into()))
            } else {
                Ok(ClearWhite)
            }
        });
        assert!(handle.get().is_err());
        assert!(!handle.is_initialized());
        assert!(handle.get().is_ok());
    }
}
