use approx::assert_relative_eq;
use limen_imgproc::filter::uniform_filter;
use limen_imgproc::histogram::{histogram, HistogramSource};
use limen_imgproc::label::label;
use limen_imgproc::padding::PaddingMode;
use limen_imgproc::threshold::{
    apply_hysteresis_threshold, mean_std, threshold_otsu, threshold_sauvola, Level,
    ThresholdInput,
};
use limen_imgproc::ThresholdError;
use limen_tensor::{Tensor2, Tensor3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BLOBS: [[usize; 2]; 3] = [[10, 10], [30, 40], [50, 20]];

fn is_text(i: usize, j: usize) -> bool {
    BLOBS
        .iter()
        .any(|&[r, c]| (r..r + 5).contains(&i) && (c..c + 5).contains(&j))
}

/// Dark 5x5 glyphs on a bright background with a gentle horizontal gradient.
fn document_page() -> Tensor2<u8> {
    Tensor2::from_shape_fn([64, 64], |[i, j]| {
        if is_text(i, j) {
            20
        } else {
            200 + (j / 8) as u8
        }
    })
}

#[test]
fn sauvola_segments_dark_text() -> Result<(), ThresholdError> {
    let page = document_page();
    let thresh = threshold_sauvola(&page, &[15], 0.2, None)?;

    for i in 0..64 {
        for j in 0..64 {
            let value = *page.get_unchecked([i, j]) as f64;
            let below = value < *thresh.get_unchecked([i, j]);
            assert_eq!(below, is_text(i, j), "pixel ({i}, {j})");
        }
    }
    Ok(())
}

#[test]
fn otsu_matches_on_precomputed_histogram() -> Result<(), ThresholdError> {
    let page = document_page();
    let from_image = threshold_otsu(ThresholdInput::Image(&page), 256)?;

    let hist = histogram(page.as_slice(), 256, HistogramSource::Image, false)?;
    let from_hist = threshold_otsu(ThresholdInput::<u8, 2>::Histogram(&hist), 256)?;

    assert_eq!(from_image, from_hist);
    assert!((20.0..200.0).contains(&from_image));
    Ok(())
}

#[test]
fn local_mean_matches_box_filter_3d() -> Result<(), ThresholdError> {
    let mut rng = StdRng::seed_from_u64(42);
    let data: Vec<f64> = (0..6 * 7 * 9).map(|_| rng.random()).collect();
    let volume = Tensor3::from_shape_vec([6, 7, 9], data)?;

    let (mean, _) = mean_std(&volume, &[3, 5, 7])?;
    let boxed = uniform_filter(&volume, &[3, 5, 7], PaddingMode::Reflect101)?;

    for (a, b) in mean.iter().zip(boxed.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-9);
    }
    Ok(())
}

#[test]
fn hysteresis_keeps_seeded_volume_regions() -> Result<(), ThresholdError> {
    let mut volume = Tensor3::<u8>::zeros([8, 8, 8]);
    // region A holds a seed voxel above the high level, region B does not
    for idx in [[1, 1, 1], [1, 1, 2], [1, 2, 2], [2, 2, 2]] {
        if let Some(v) = volume.get_mut(idx) {
            *v = 5;
        }
    }
    for idx in [[5, 5, 5], [5, 5, 6], [6, 5, 6]] {
        if let Some(v) = volume.get_mut(idx) {
            *v = 5;
        }
    }
    if let Some(v) = volume.get_mut([2, 2, 2]) {
        *v = 9;
    }

    let mask = apply_hysteresis_threshold(&volume, Level::Scalar(4.0), Level::Scalar(8.0))?;
    assert_eq!(mask.iter().filter(|&&m| m).count(), 4);
    assert_eq!(mask.get([1, 1, 1]), Some(&true));
    assert_eq!(mask.get([5, 5, 5]), Some(&false));

    let (_, count) = label(&mask, 1)?;
    assert_eq!(count, 1);
    Ok(())
}
