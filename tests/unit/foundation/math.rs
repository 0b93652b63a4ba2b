use super::*;

#[test]
fn mul_div255_variants_align() {
    for x in [0u16, 1, 127, 255] {
        for y in [0u16, 1, 127, 255] {
            assert_eq!(u16::from(mul_div255_u8(x, y)), mul_div255_u16(x, y));
        }
    }
}

#[test]
fn premultiply_then_unpremultiply_is_close() {
    let mut px = vec![200u8, 100, 50, 128, 10, 20, 30, 0, 1, 2, 3, 255];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[4..8], &[0, 0, 0, 0]);
    assert_eq!(&px[8..12], &[1, 2, 3, 255]);
    unpremultiply_rgba8_in_place(&mut px);
    for (got, want) in px[0..3].iter().zip([200u8, 100, 50]) {
        assert!((i16::from(*got) - i16::from(want)).abs() <= 2);
    }
}
