use candle_core::{Device, Tensor};
use talentrag_embed::masked_mean_l2;

#[test]
fn masked_mean_ignores_padding_per_row() {
    let dev = Device::Cpu;
    // Batch of two, two tokens each, hidden dim 2.
    let h = Tensor::from_slice(
        &[3.0f32, 4.0, 100.0, 100.0, // row 0: second token is padding
          1.0, 0.0, 0.0, 1.0],       // row 1: both tokens count
        (2, 2, 2),
        &dev,
    ).unwrap();
    let mask = Tensor::from_slice(&[1u32, 0, 1, 1], (2, 2), &dev).unwrap();
    let out: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();

    let expected_row0 = [0.6f32, 0.8];
    let s = 0.5f32.sqrt();
    let expected_row1 = [s, s];
    for (a, b) in out[0].iter().zip(expected_row0) { assert!((a - b).abs() < 1e-5, "a={a} b={b}"); }
    for (a, b) in out[1].iter().zip(expected_row1) { assert!((a - b).abs() < 1e-5, "a={a} b={b}"); }
}
