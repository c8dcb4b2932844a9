// Spectral module - Breath-band features from magnitude spectra
//
// Both features look only at the band where breath noise concentrates.
// Magnitudes are normalized analyser values (0.0 to 1.0), one per FFT bin,
// with bin i centred on i * sample_rate / fft_size Hz.

/// Lower edge of the breath band in Hz
pub const BREATH_BAND_LOW_HZ: f64 = 80.0;

/// Upper edge of the breath band in Hz (exclusive)
pub const BREATH_BAND_HIGH_HZ: f64 = 600.0;

/// Breath-band feature computation for one sample rate / FFT size pair
pub struct SpectralFeatures {
    sample_rate: u32,
    fft_size: usize,
}

impl SpectralFeatures {
    /// Create a new spectral features processor
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `fft_size` - FFT window size (magnitude frames carry fft_size / 2 bins)
    pub fn new(sample_rate: u32, fft_size: usize) -> Self {
        Self {
            sample_rate,
            fft_size,
        }
    }

    /// Width of one FFT bin in Hz
    pub fn bin_width(&self) -> f64 {
        self.sample_rate as f64 / self.fft_size.max(1) as f64
    }

    /// Bin range `[low, high)` covering the breath band
    pub fn band(&self) -> (usize, usize) {
        let bin_width = self.bin_width();
        if bin_width <= 0.0 {
            return (0, 0);
        }
        let low = (BREATH_BAND_LOW_HZ / bin_width).floor() as usize;
        let high = (BREATH_BAND_HIGH_HZ / bin_width).floor() as usize;
        (low, high)
    }

    /// Compute the RMS of breath-band magnitudes
    ///
    /// Formula: rms = sqrt(Σ|X[i]|² / (high - low)) for i in [low, high)
    ///
    /// Bins beyond the end of `spectrum` count as silent. An empty band
    /// yields 0.0.
    pub fn compute_band_rms(&self, spectrum: &[f32]) -> f64 {
        let (low, high) = self.band();
        if high <= low {
            return 0.0;
        }

        let energy: f64 = band_slice(spectrum, low, high)
            .iter()
            .map(|&mag| {
                let mag = mag as f64;
                mag * mag
            })
            .sum();

        (energy / (high - low) as f64).sqrt()
    }

    /// Compute spectral centroid restricted to the breath band
    ///
    /// Formula: centroid = Σ(f_i × |X[i]|) / Σ|X[i]|
    ///
    /// # Returns
    /// Centroid in Hz, or 0.0 when the band carries no energy
    pub fn compute_centroid(&self, spectrum: &[f32]) -> f64 {
        let (low, high) = self.band();
        let bin_width = self.bin_width();

        let mut weighted_sum = 0.0;
        let mut magnitude_sum = 0.0;
        for (offset, &mag) in band_slice(spectrum, low, high).iter().enumerate() {
            let freq = (low + offset) as f64 * bin_width;
            weighted_sum += freq * mag as f64;
            magnitude_sum += mag as f64;
        }

        if magnitude_sum > 0.0 {
            weighted_sum / magnitude_sum
        } else {
            0.0
        }
    }
}

fn band_slice(spectrum: &[f32], low: usize, high: usize) -> &[f32] {
    let high = high.min(spectrum.len());
    if low >= high {
        &[]
    } else {
        &spectrum[low..high]
    }
}
