use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};

use super::Tensor;
use crate::errors::TensorError;

/// 图像张量的尺寸信息：批次、高、宽、通道
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDims {
    pub batch: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl Tensor {
    /// 宿主中的IMAGE张量形状为[B,H,W,C]，像素为[0,1]区间的浮点数；[H,W,C]视作单张图像
    pub fn image_dims(&self) -> Result<ImageDims, TensorError> {
        let (batch, height, width, channels) = match *self.shape() {
            [h, w, c] => (1, h, w, c),
            [b, h, w, c] => (b, h, w, c),
            _ => return Err(TensorError::NotAnImage(self.shape().to_vec())),
        };
        if !matches!(channels, 1 | 3 | 4) {
            return Err(TensorError::UnsupportedChannels(channels));
        }
        Ok(ImageDims {
            batch,
            height,
            width,
            channels,
        })
    }

    /// 取出批次中的第`index`张图像，转换为Image库的`DynamicImage`格式。
    /// 像素先截断到[0,1]再乘以255，小数部分直接舍去。
    pub fn to_image(&self, index: usize) -> Result<DynamicImage, TensorError> {
        let dims = self.image_dims()?;
        if index >= dims.batch {
            return Err(TensorError::BatchIndexOutOfRange {
                index,
                batch: dims.batch,
            });
        }
        let per_image = dims.height * dims.width * dims.channels;
        let pixels = self
            .values_f32()
            .into_iter()
            .skip(index * per_image)
            .take(per_image)
            .map(|x| (x.clamp(0., 1.) * 255.) as u8)
            .collect::<Vec<_>>();

        let (width, height) = (dims.width as u32, dims.height as u32);
        let image = match dims.channels {
            1 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
            _ => RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8),
        };
        image.ok_or_else(|| TensorError::ImageEncode("像素缓冲区大小与图像尺寸不符".to_string()))
    }

    /// 将批次中的第`index`张图像编码为PNG字节
    pub fn to_png_bytes(&self, index: usize) -> Result<Vec<u8>, TensorError> {
        let image = self.to_image(index)?;
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| TensorError::ImageEncode(e.to_string()))?;
        Ok(bytes)
    }
}
