use image::RgbImage;
use target_loc_core::{gray_from_rgb, GrayImage, RgbImageView};

/// One captured RGB frame, owned by the loop for a single tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Replicate a grayscale buffer into RGB; `None` if `data` is too short.
    pub fn from_gray(width: u32, height: u32, data: &[u8]) -> Option<Self> {
        let n = width as usize * height as usize;
        let gray = data.get(..n)?;
        let rgb = gray.iter().flat_map(|&v| [v, v, v]).collect();
        RgbImage::from_raw(width, height, rgb).map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    pub fn rgb_view(&self) -> RgbImageView<'_> {
        RgbImageView {
            width: self.image.width() as usize,
            height: self.image.height() as usize,
            data: self.image.as_raw(),
        }
    }

    /// Luma copy for the fiducial detector.
    pub fn to_gray(&self) -> GrayImage {
        gray_from_rgb(&self.rgb_view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_round_trip() {
        let frame = Frame::from_gray(3, 2, &[0, 50, 100, 150, 200, 250]).expect("frame");
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.image().get_pixel(1, 0).0, [50, 50, 50]);
        assert_eq!(frame.to_gray().data, vec![0, 50, 100, 150, 200, 250]);
        assert!(Frame::from_gray(3, 3, &[0; 4]).is_none());
    }
}
