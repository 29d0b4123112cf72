//! Device-dependent integration tests.
//!
//! Each test acquires a headless context and returns early when no adapter
//! is available, so machines without a GPU stay green.

use std::sync::Arc;

use mandelview::{
    colour, Error, GpuContext, MandelbrotView, MemoryPool, Palette, SettingsUpdate, ViewSettings,
};

fn context() -> Option<Arc<GpuContext>> {
    match GpuContext::headless() {
        Ok(ctx) => Some(ctx),
        Err(init_error) => {
            eprintln!("skipping GPU test: {init_error}");
            None
        }
    }
}

fn small_settings() -> ViewSettings {
    ViewSettings {
        pixels_per_side: 32,
        max_iterations: 64,
        ..ViewSettings::default()
    }
}

/// Bytes one 32×32 view reserves: 40 per pixel across grid, counts,
/// channels and staging, plus two 16-byte uniform blocks.
const SMALL_VIEW_BYTES: u64 = 32 * 32 * 40 + 32;

#[test]
fn counts_match_host_semantics_on_stable_regions() {
    let Some(ctx) = context() else { return };
    let pool = Arc::new(MemoryPool::new(64 * 1024 * 1024));

    // Every coordinate far outside the set breaches on every iteration, so
    // the recorded count is the final index regardless of rounding.
    let mut view = MandelbrotView::new(
        Arc::clone(&ctx),
        Arc::clone(&pool),
        ViewSettings {
            center: (10.0, 10.0),
            magnification: 1.0,
            max_iterations: 4,
            ..small_settings()
        },
    )
    .unwrap();
    view.render_full().unwrap();
    let field = view.escape_field().unwrap();
    assert_eq!(field.counts.len(), 32 * 32);
    assert!(field.counts.iter().all(|&count| count == 3));

    // A window tight around the origin never escapes: count 0 everywhere.
    view.update(SettingsUpdate {
        center: Some((0.0, 0.0)),
        magnification: Some(1.0e6),
        max_iterations: Some(64),
        ..SettingsUpdate::default()
    })
    .unwrap();
    view.render_full().unwrap();
    assert!(view
        .escape_field()
        .unwrap()
        .counts
        .iter()
        .all(|&count| count == 0));
}

#[test]
fn colour_kernel_matches_host_mapping() {
    let Some(ctx) = context() else { return };
    let pool = Arc::new(MemoryPool::new(64 * 1024 * 1024));

    let mut view =
        MandelbrotView::new(Arc::clone(&ctx), Arc::clone(&pool), small_settings()).unwrap();
    view.render_full().unwrap();

    for palette in [Palette::Hsv0, Palette::Hsv1, Palette::Hsv2] {
        let image = view.render_image(palette).unwrap().clone();
        let counts = view.escape_field().unwrap().counts.clone();
        for (index, count) in counts.iter().enumerate() {
            let expected = colour::map_count(palette, *count);
            let actual = [
                image.channel_a[index],
                image.channel_b[index],
                image.channel_c[index],
            ];
            assert_eq!(actual, expected, "pixel {index} under {palette:?}");
        }
    }
}

#[test]
fn identical_renders_are_bit_identical() {
    let Some(ctx) = context() else { return };
    let pool = Arc::new(MemoryPool::new(64 * 1024 * 1024));

    let mut view =
        MandelbrotView::new(Arc::clone(&ctx), Arc::clone(&pool), small_settings()).unwrap();
    let first = view.render_full().unwrap().clone();
    let first_field = view.escape_field().unwrap().clone();
    let second = view.render_full().unwrap().clone();

    assert_eq!(first, second);
    assert_eq!(&first_field, view.escape_field().unwrap());
}

#[test]
fn render_image_without_a_render_is_rejected() {
    let Some(ctx) = context() else { return };
    let pool = Arc::new(MemoryPool::new(64 * 1024 * 1024));

    let mut view = MandelbrotView::new(ctx, pool, small_settings()).unwrap();
    assert!(matches!(
        view.render_image(Palette::Hsv0),
        Err(Error::Unbuilt)
    ));
    assert!(matches!(view.export_png(), Err(Error::Unbuilt)));
}

#[test]
fn allocation_failure_preserves_the_last_render() {
    let Some(ctx) = context() else { return };
    // Room for exactly one 32×32 buffer set.
    let pool = Arc::new(MemoryPool::new(SMALL_VIEW_BYTES + 1024));

    let mut view =
        MandelbrotView::new(Arc::clone(&ctx), Arc::clone(&pool), small_settings()).unwrap();
    view.render_full().unwrap();

    // Growing the view needs a second, larger set before the first can be
    // released; that must fail without touching the rendered state.
    view.update(SettingsUpdate {
        pixels_per_side: Some(64),
        ..SettingsUpdate::default()
    })
    .unwrap();
    match view.render_full() {
        Err(Error::Allocation { .. }) => {}
        other => panic!("expected allocation failure, got {other:?}"),
    }

    let image = view.image().expect("last-good image dropped");
    assert_eq!(image.size.width, 32);
    assert_eq!(image.size.height, 32);

    // Shrinking back re-uses the original set and renders again.
    view.update(SettingsUpdate {
        pixels_per_side: Some(32),
        ..SettingsUpdate::default()
    })
    .unwrap();
    view.render_full().unwrap();
}

#[test]
fn dropping_a_view_frees_its_budget() {
    let Some(ctx) = context() else { return };
    let pool = Arc::new(MemoryPool::new(SMALL_VIEW_BYTES));

    let mut first =
        MandelbrotView::new(Arc::clone(&ctx), Arc::clone(&pool), small_settings()).unwrap();
    first.render_full().unwrap();
    assert_eq!(pool.used(), SMALL_VIEW_BYTES);

    // The budget is fully committed; a sibling view cannot render.
    let mut second =
        MandelbrotView::new(Arc::clone(&ctx), Arc::clone(&pool), small_settings()).unwrap();
    assert!(matches!(
        second.render_full(),
        Err(Error::Allocation { .. })
    ));

    drop(first);
    assert_eq!(pool.used(), 0);
    second.render_full().unwrap();
}

#[test]
fn reset_returns_the_view_to_unbuilt() {
    let Some(ctx) = context() else { return };
    let pool = Arc::new(MemoryPool::new(64 * 1024 * 1024));

    let mut view =
        MandelbrotView::new(Arc::clone(&ctx), Arc::clone(&pool), small_settings()).unwrap();
    view.render_full().unwrap();
    assert!(pool.used() > 0);

    view.reset();
    assert_eq!(pool.used(), 0);
    assert!(view.image().is_none());
    assert!(view.escape_field().is_none());
    assert!(matches!(view.export_png(), Err(Error::Unbuilt)));

    // A reset view renders again from scratch.
    view.render_full().unwrap();
}
