use approx::assert_abs_diff_eq;
use ndarray::array;

use crate::tensor::{DType, Tensor};

#[test]
fn test_to_f32_from_integers() {
    let tensor = Tensor::from_array(&array![[1i32, -2], [3, 4]]);
    let float = tensor.to_f32();
    assert_eq!(float.dtype(), DType::Float32);
    assert_eq!(float.shape(), &[2, 2]);
    assert_eq!(float.values_f32(), vec![1., -2., 3., 4.]);
}

#[test]
fn test_to_f32_from_half_precision() {
    // 1.0, -2.0, 0.5, 65504(最大值)
    let bits: [u16; 4] = [0x3c00, 0xc000, 0x3800, 0x7bff];
    let bytes = bits.iter().flat_map(|b| b.to_le_bytes()).collect();
    let tensor = Tensor::from_bytes(DType::Float16, &[4], bytes).unwrap();
    assert_eq!(tensor.values_f32(), vec![1., -2., 0.5, 65504.]);

    // 最小的非规格化数
    let tensor = Tensor::from_bytes(DType::Float16, &[1], vec![0x01, 0x00]).unwrap();
    assert_abs_diff_eq!(tensor.values_f32()[0], 5.960_464_5e-8, epsilon = 1e-12);

    let tensor = Tensor::from_bytes(DType::Float16, &[1], 0x7c00u16.to_le_bytes().to_vec()).unwrap();
    assert!(tensor.values_f32()[0].is_infinite());
}

#[test]
fn test_to_f32_from_bfloat16() {
    let bits: [u16; 2] = [0x3f80, 0xc040];
    let bytes = bits.iter().flat_map(|b| b.to_le_bytes()).collect();
    let tensor = Tensor::from_bytes(DType::BFloat16, &[2], bytes).unwrap();
    assert_eq!(tensor.values_f32(), vec![1., -3.]);
}

#[test]
fn test_scale() {
    let tensor = Tensor::new(&[1., 2., 3.], &[3]);
    let scaled = tensor.scale(2.5);
    assert_eq!(scaled.values_f32(), vec![2.5, 5., 7.5]);
    assert_eq!(scaled.shape(), tensor.shape());

    let tensor = Tensor::from_array(&array![1f64, 2.]);
    let scaled = tensor.scale(0.5);
    assert_eq!(scaled.dtype(), DType::Float32);
    assert_eq!(scaled.values_f32(), vec![0.5, 1.]);
}
