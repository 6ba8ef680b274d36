use proptest::prelude::*;
use stream_common::{scale_source_to_destination, Rect};

proptest! {
    #[test]
    fn fitted_rect_stays_inside_destination(
        sw in 1u32..8192, sh in 1u32..8192,
        dw in 1u32..8192, dh in 1u32..8192,
    ) {
        let dst = Rect::from_size(dw, dh);
        let out = scale_source_to_destination(Rect::from_size(sw, sh), dst);

        prop_assert!(out.x >= 0 && out.y >= 0);
        prop_assert!(out.right() <= dst.right());
        prop_assert!(out.bottom() <= dst.bottom());
        // One axis always fills the destination completely
        prop_assert!(out.width == dw || out.height == dh);
    }

    #[test]
    fn relative_clamped_never_escapes(
        x in -10_000i32..10_000, y in -10_000i32..10_000,
        w in 1u32..4096, h in 1u32..4096,
    ) {
        let r = Rect::new(17, 31, w, h);
        let p = r.relative_clamped(x, y);
        prop_assert!((0..=w as i32).contains(&p.x));
        prop_assert!((0..=h as i32).contains(&p.y));
    }
}
