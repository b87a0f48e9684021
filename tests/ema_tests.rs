use round_forecast::indicator::ema::Ema;
use round_forecast::indicator::stats::{ema, rsi};

#[test]
fn ema_warms_up_with_sma_seed() {
    let mut ema = Ema::new(3);
    assert_eq!(ema.push(2.0), None);
    assert_eq!(ema.push(4.0), None);
    let seed = ema.push(6.0).unwrap();
    assert!((seed - 4.0).abs() < 1e-12);
    // alpha = 2 / (3 + 1)
    let next = ema.push(8.0).unwrap();
    assert!((next - 6.0).abs() < 1e-12);
}

#[test]
fn newest_first_ema_matches_chronological_feed() {
    let newest_first = [8.0, 6.0, 4.0, 2.0];
    assert!((ema(&newest_first, 3).unwrap() - 6.0).abs() < 1e-12);
    assert_eq!(ema(&newest_first, 5), None);
}

#[test]
fn rsi_saturates_on_one_sided_moves() {
    let rising: Vec<f64> = (0..20).rev().map(|v| v as f64).collect();
    assert_eq!(rsi(&rising, 14), Some(100.0));
    assert_eq!(rsi(&[5.0; 20], 14), Some(50.0));
    assert_eq!(rsi(&[5.0; 14], 14), None);
}
