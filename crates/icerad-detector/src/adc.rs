//! Analog-to-digital conversion.
//!
//! Digitization proceeds in fixed stages:
//!
//! 1. Resolve the ADC parameter set from the channel description — the
//!    readout set or, on request, the `trigger_` set for detectors with a
//!    separate trigger digitizer. Mandatory fields are checked here.
//! 2. Apply the conversion delay: a fixed per-channel time delay plus an
//!    optional random clock offset of up to one ADC clock cycle.
//! 3. Optionally select a Nyquist zone with an 8th-order Butterworth
//!    bandpass before downsampling.
//! 4. Downsample to the ADC clock by Fourier-upsampling to a fine grid
//!    first and then linearly interpolating onto the clock times. A plain
//!    spectral downsample would discard the higher Nyquist zones, which
//!    undersampling designs rely on.
//! 5. Quantize with a perfect comparator (floor or ceiling), saturating
//!    symmetrically at the rails.
//! 6. Optionally FIR-upsample the quantized trace, the way an FPGA does
//!    after conversion; the result is no longer discrete.
//!
//! Digitized traces always keep an even number of samples.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::info;

use icerad_core::{units, utils, SimStation, Trace};
use icerad_signal::{filter, resample};

use crate::description::{ChannelDescription, StationDescription};
use crate::error::DetectorError;

/// Fine intermediate grid used before interpolation onto the ADC clock.
const UPSAMPLING_FREQUENCY: f64 = 5.0 * units::GHZ;

/// Butterworth order of the Nyquist-zone selection filter.
const NYQUIST_FILTER_ORDER: usize = 8;

/// Default band kept clear of the Nyquist-zone edges.
pub const DEFAULT_BANDWIDTH_EDGE: f64 = 20.0 * units::MHZ;

/// Quantizer variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdcType {
    /// Comparator taking the floor of the voltage / LSB ratio
    #[default]
    PerfectFloor,
    /// Comparator taking the ceiling of the voltage / LSB ratio
    PerfectCeiling,
}

/// Output domain of the digitized trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdcOutput {
    /// Discretized voltages in V
    #[default]
    Voltage,
    /// Raw ADC counts
    Counts,
}

/// Options controlling one digitization pass.
#[derive(Debug, Clone, Copy)]
pub struct AdcOptions {
    /// Use the `trigger_` parameter set instead of the readout set
    pub trigger_adc: bool,
    /// Add a random clock offset of up to one ADC clock cycle
    pub random_clock_offset: bool,
    /// Quantizer variant
    pub adc_type: AdcType,
    /// Output domain
    pub output: AdcOutput,
    /// FIR upsampling factor applied after quantization (>= 2 to take
    /// effect)
    pub upsampling_factor: Option<usize>,
    /// Nyquist zone to select before downsampling (1 = baseband); `None`
    /// skips the filter
    pub nyquist_zone: Option<usize>,
    /// Margin kept inside the zone edges by the selection filter, in GHz
    pub bandwidth_edge: f64,
}

impl Default for AdcOptions {
    fn default() -> Self {
        Self {
            trigger_adc: false,
            random_clock_offset: true,
            adc_type: AdcType::PerfectFloor,
            output: AdcOutput::Voltage,
            upsampling_factor: None,
            nyquist_zone: None,
            bandwidth_edge: DEFAULT_BANDWIDTH_EDGE,
        }
    }
}

/// Resolved mandatory ADC parameters.
#[derive(Debug, Clone, Copy)]
struct AdcParams {
    n_bits: u32,
    reference_voltage: f64,
    sampling_frequency: f64,
    time_delay: f64,
    ntaps: Option<usize>,
}

fn resolve_params(
    channel: &ChannelDescription,
    trigger_adc: bool,
) -> Result<AdcParams, DetectorError> {
    let fields = channel.adc_fields(trigger_adc);
    let channel_id = channel.id.0;

    let n_bits = fields.n_bits.ok_or(DetectorError::MissingAdcField {
        field: if trigger_adc {
            "trigger_adc.n_bits"
        } else {
            "adc.n_bits"
        },
        channel_id,
    })?;
    let reference_voltage = fields
        .reference_voltage
        .ok_or(DetectorError::MissingAdcField {
            field: if trigger_adc {
                "trigger_adc.reference_voltage"
            } else {
                "adc.reference_voltage"
            },
            channel_id,
        })?;
    let sampling_frequency = fields
        .sampling_frequency
        .ok_or(DetectorError::MissingAdcField {
            field: if trigger_adc {
                "trigger_adc.sampling_frequency"
            } else {
                "adc.sampling_frequency"
            },
            channel_id,
        })?;

    Ok(AdcParams {
        n_bits,
        reference_voltage,
        sampling_frequency,
        time_delay: fields.time_delay.unwrap_or(0.0),
        ntaps: fields.ntaps,
    })
}

/// Clips a counts trace to the symmetric ADC rails
/// `[-2^(bits-1), 2^(bits-1) - 1]`.
fn apply_saturation(counts: &mut [f64], n_bits: u32) {
    let half_range = 2f64.powi(n_bits as i32 - 1);
    let highest = half_range - 1.0;
    let lowest = -half_range;
    for c in counts.iter_mut() {
        if *c > highest {
            *c = highest;
        } else if *c < lowest {
            *c = lowest;
        }
    }
}

/// Simulates a perfect comparator flash ADC: the voltage is compared to
/// the least-significant-bit voltage and the floor (or ceiling) of the
/// ratio is the digitized value.
#[must_use]
pub fn perfect_comparator(
    samples: &[f64],
    n_bits: u32,
    reference_voltage: f64,
    adc_type: AdcType,
    output: AdcOutput,
) -> Vec<f64> {
    let lsb = reference_voltage / (2f64.powi(n_bits as i32 - 1) - 1.0);

    let mut counts: Vec<f64> = samples
        .iter()
        .map(|&v| match adc_type {
            AdcType::PerfectFloor => (v / lsb).floor(),
            AdcType::PerfectCeiling => (v / lsb).ceil(),
        })
        .collect();

    apply_saturation(&mut counts, n_bits);
    for c in &mut counts {
        *c = c.round();
    }

    match output {
        AdcOutput::Voltage => counts.iter().map(|&c| c * lsb).collect(),
        AdcOutput::Counts => counts,
    }
}

/// Convenience wrapper for the floor comparator.
#[must_use]
pub fn perfect_floor_comparator(
    samples: &[f64],
    n_bits: u32,
    reference_voltage: f64,
    output: AdcOutput,
) -> Vec<f64> {
    perfect_comparator(samples, n_bits, reference_voltage, AdcType::PerfectFloor, output)
}

/// Convenience wrapper for the ceiling comparator.
#[must_use]
pub fn perfect_ceiling_comparator(
    samples: &[f64],
    n_bits: u32,
    reference_voltage: f64,
    output: AdcOutput,
) -> Vec<f64> {
    perfect_comparator(samples, n_bits, reference_voltage, AdcType::PerfectCeiling, output)
}

/// The analog-to-digital converter module.
///
/// [`AnalogToDigitalConverter::digital_trace`] digitizes a single channel
/// without touching it, so a trigger path can quantize a copy while the
/// readout keeps full precision. [`AnalogToDigitalConverter::run`]
/// replaces every channel trace of a station with its digitized version.
#[derive(Debug)]
pub struct AnalogToDigitalConverter {
    rng: StdRng,
    elapsed: Duration,
}

impl AnalogToDigitalConverter {
    /// Creates a converter with a seeded clock-offset generator.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            elapsed: Duration::ZERO,
        }
    }

    /// Digitizes one channel trace against its description.
    ///
    /// Returns the digitized trace together with the effective output
    /// sampling frequency in GHz (the ADC clock, times the FIR factor
    /// when upsampling was requested).
    ///
    /// # Errors
    ///
    /// - [`DetectorError::MissingAdcField`] when a mandatory field is
    ///   absent from the selected parameter set.
    /// - [`DetectorError::AdcRateAboveChannelRate`] when the ADC clock is
    ///   faster than the simulated trace.
    /// - [`DetectorError::InvalidNyquistZone`] /
    ///   [`DetectorError::NyquistZoneAboveInput`] for zone selection
    ///   problems.
    pub fn digital_trace(
        &mut self,
        trace: &Trace,
        channel: &ChannelDescription,
        options: &AdcOptions,
    ) -> Result<(Trace, f64), DetectorError> {
        let params = resolve_params(channel, options.trigger_adc)?;
        let input_rate = trace.sampling_rate();

        if params.sampling_frequency > input_rate {
            return Err(DetectorError::AdcRateAboveChannelRate {
                channel_id: channel.id.0,
                adc_rate: params.sampling_frequency,
                channel_rate: input_rate,
            });
        }

        let mut time_delay = params.time_delay;
        if options.random_clock_offset {
            let clock_offset: f64 = self.rng.gen_range(0.0..1.0);
            time_delay += clock_offset / params.sampling_frequency;
        }

        // Nyquist-zone selection
        let filtered: Vec<f64> = match options.nyquist_zone {
            Some(zone) => {
                if zone < 1 {
                    return Err(DetectorError::InvalidNyquistZone { zone });
                }
                let low = (zone as f64 - 1.0) * params.sampling_frequency / 2.0
                    + options.bandwidth_edge;
                let high =
                    zone as f64 * params.sampling_frequency / 2.0 - options.bandwidth_edge;
                if high > input_rate / 2.0 {
                    return Err(DetectorError::NyquistZoneAboveInput {
                        required: high,
                        available: input_rate / 2.0,
                    });
                }
                filter::butterworth_filter_trace(
                    trace.samples(),
                    input_rate,
                    (low, high),
                    NYQUIST_FILTER_ORDER,
                )?
            }
            None => trace.samples().to_vec(),
        };

        // conversion delay, truncating the tail the delay pushed out
        let delayed_samples = trace
            .len()
            .saturating_sub((input_rate / params.sampling_frequency).round() as usize + 1);
        if delayed_samples == 0 {
            return Err(icerad_core::TraceError::InsufficientSamples {
                required: (input_rate / params.sampling_frequency).round() as usize + 2,
                available: trace.len(),
            }
            .into());
        }
        let delayed =
            resample::delay_trace(&filtered, input_rate, time_delay, Some(delayed_samples));

        // fine intermediate grid; interpolation (not a spectral cut)
        // preserves the higher Nyquist zones
        let (fine, fine_rate) = if UPSAMPLING_FREQUENCY > input_rate {
            let n_fine = (UPSAMPLING_FREQUENCY * delayed.len() as f64 / input_rate) as usize;
            (resample::fourier_resample(&delayed, n_fine)?, UPSAMPLING_FREQUENCY)
        } else {
            (delayed, input_rate)
        };

        // linear interpolation onto the ADC clock
        let duration = fine.len() as f64 / fine_rate;
        let n_out = (duration * params.sampling_frequency) as usize;
        let fine_times = utils::linspace(0.0, duration, fine.len());
        let clock_times = utils::linspace(0.0, n_out as f64 / params.sampling_frequency, n_out);
        let mut digital: Vec<f64> = clock_times
            .iter()
            .map(|&t| resample::linear_interp(t, &fine_times, &fine))
            .collect();

        // quantization
        digital = perfect_comparator(
            &digital,
            params.n_bits,
            params.reference_voltage,
            options.adc_type,
            options.output,
        );

        // FIR upsampling after conversion
        let mut output_rate = params.sampling_frequency;
        if let Some(factor) = options.upsampling_factor {
            if factor >= 2 {
                let ntaps = params.ntaps.unwrap_or(factor * 4);
                digital = resample::upsampling_fir(&digital, factor, ntaps)?;
                output_rate *= factor as f64;
            }
        }

        // even number of samples
        if digital.len() % 2 == 1 {
            digital.pop();
        }

        let digitized = Trace::new(digital, output_rate, trace.start_time())?;
        Ok((digitized, output_rate))
    }

    /// Digitizes every channel of a station in place.
    ///
    /// # Errors
    ///
    /// Fails on the first channel whose digitization fails; earlier
    /// channels stay digitized.
    pub fn run(
        &mut self,
        station: &mut SimStation,
        det_station: &StationDescription,
        options: &AdcOptions,
    ) -> Result<(), DetectorError> {
        let start = Instant::now();
        for sim_channel in &mut station.channels {
            let det_channel = det_station.channel(sim_channel.id)?;
            let (digitized, _rate) =
                self.digital_trace(&sim_channel.trace, det_channel, options)?;
            sim_channel.trace = digitized;
        }
        self.elapsed += start.elapsed();
        Ok(())
    }

    /// Logs and returns the total time spent in this module.
    pub fn end(&self) -> Duration {
        info!("total time used by the ADC module is {:?}", self.elapsed);
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use icerad_core::ChannelId;

    use crate::description::AdcFields;

    fn channel_with_adc() -> ChannelDescription {
        ChannelDescription {
            id: ChannelId(0),
            antenna_model: "bicone".into(),
            position_m: [0.0, 0.0, -1.0],
            sampling_frequency: 2.0,
            noise_rms: 0.01,
            trigger_threshold: 0.05,
            adc: AdcFields {
                n_bits: Some(8),
                reference_voltage: Some(1.0),
                sampling_frequency: Some(0.5),
                time_delay: None,
                ntaps: None,
            },
            trigger_adc: AdcFields::default(),
        }
    }

    fn tone_trace(rate: f64, n: usize, amplitude: f64) -> Trace {
        let samples: Vec<f64> = (0..n)
            .map(|i| amplitude * (2.0 * std::f64::consts::PI * 0.1 * i as f64 / rate).sin())
            .collect();
        Trace::new(samples, rate, 0.0).unwrap()
    }

    #[test]
    fn floor_comparator_quantizes_to_lsb_multiples() {
        // 8 bits, 1 V reference: LSB = 1/127 V
        let lsb = 1.0 / 127.0;
        let out = perfect_floor_comparator(&[0.5, -0.5, 0.0], 8, 1.0, AdcOutput::Voltage);
        for v in &out {
            let counts = v / lsb;
            assert!((counts - counts.round()).abs() < 1e-9);
        }
        assert!((out[0] - (0.5 / lsb).floor() * lsb).abs() < 1e-12);
    }

    #[test]
    fn ceiling_comparator_rounds_up() {
        let floor = perfect_floor_comparator(&[0.3], 8, 1.0, AdcOutput::Counts);
        let ceil = perfect_ceiling_comparator(&[0.3], 8, 1.0, AdcOutput::Counts);
        assert!((ceil[0] - floor[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn saturation_clips_at_the_rails() {
        let out = perfect_floor_comparator(&[10.0, -10.0], 8, 1.0, AdcOutput::Counts);
        assert_eq!(out[0], 127.0);
        assert_eq!(out[1], -128.0);
    }

    #[test]
    fn counts_output_is_integral() {
        let out = perfect_floor_comparator(&[0.123, -0.456], 12, 1.0, AdcOutput::Counts);
        for v in &out {
            assert!((v - v.round()).abs() < 1e-12);
        }
    }

    #[test]
    fn digital_trace_runs_at_the_adc_clock() {
        let mut adc = AnalogToDigitalConverter::new(42);
        let trace = tone_trace(2.0, 1024, 0.5);
        let (digitized, rate) = adc
            .digital_trace(&trace, &channel_with_adc(), &AdcOptions::default())
            .unwrap();
        assert!((rate - 0.5).abs() < 1e-12);
        assert!((digitized.sampling_rate() - 0.5).abs() < 1e-12);
        assert_eq!(digitized.len() % 2, 0);
        // 512 ns of input at the 0.5 GHz ADC clock, minus the delay guard
        assert!(digitized.len() >= 248 && digitized.len() <= 256);
    }

    #[test]
    fn missing_mandatory_field_is_reported() {
        let mut adc = AnalogToDigitalConverter::new(1);
        let mut channel = channel_with_adc();
        channel.adc.reference_voltage = None;
        let trace = tone_trace(2.0, 256, 0.5);
        let err = adc
            .digital_trace(&trace, &channel, &AdcOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            DetectorError::MissingAdcField {
                field: "adc.reference_voltage",
                ..
            }
        ));
    }

    #[test]
    fn trigger_adc_fields_are_separate() {
        let mut adc = AnalogToDigitalConverter::new(1);
        let channel = channel_with_adc(); // trigger_adc left empty
        let trace = tone_trace(2.0, 256, 0.5);
        let options = AdcOptions {
            trigger_adc: true,
            ..AdcOptions::default()
        };
        let err = adc.digital_trace(&trace, &channel, &options).unwrap_err();
        assert!(matches!(
            err,
            DetectorError::MissingAdcField {
                field: "trigger_adc.n_bits",
                ..
            }
        ));
    }

    #[test]
    fn adc_faster_than_channel_is_rejected() {
        let mut adc = AnalogToDigitalConverter::new(1);
        let mut channel = channel_with_adc();
        channel.adc.sampling_frequency = Some(3.0);
        let trace = tone_trace(2.0, 256, 0.5);
        assert!(matches!(
            adc.digital_trace(&trace, &channel, &AdcOptions::default()),
            Err(DetectorError::AdcRateAboveChannelRate { .. })
        ));
    }

    #[test]
    fn nyquist_zone_beyond_input_is_rejected() {
        let mut adc = AnalogToDigitalConverter::new(1);
        let trace = tone_trace(2.0, 1024, 0.5);
        let options = AdcOptions {
            nyquist_zone: Some(9),
            random_clock_offset: false,
            ..AdcOptions::default()
        };
        // zone 9 of a 0.5 GHz ADC needs up to 2.25 GHz; input Nyquist is 1 GHz
        assert!(matches!(
            adc.digital_trace(&trace, &channel_with_adc(), &options),
            Err(DetectorError::NyquistZoneAboveInput { .. })
        ));
    }

    #[test]
    fn first_nyquist_zone_keeps_a_baseband_tone() {
        let mut adc = AnalogToDigitalConverter::new(7);
        let trace = tone_trace(2.0, 2048, 0.5);
        let options = AdcOptions {
            nyquist_zone: Some(1),
            random_clock_offset: false,
            ..AdcOptions::default()
        };
        let (digitized, _) = adc
            .digital_trace(&trace, &channel_with_adc(), &options)
            .unwrap();
        // the 0.1 GHz tone sits inside zone 1 of a 0.5 GHz ADC
        assert!(digitized.peak_amplitude() > 0.3);
    }

    #[test]
    fn fir_upsampling_multiplies_the_output_rate() {
        let mut adc = AnalogToDigitalConverter::new(7);
        let trace = tone_trace(2.0, 1024, 0.5);
        let options = AdcOptions {
            upsampling_factor: Some(4),
            random_clock_offset: false,
            ..AdcOptions::default()
        };
        let (digitized, rate) = adc
            .digital_trace(&trace, &channel_with_adc(), &options)
            .unwrap();
        assert!((rate - 2.0).abs() < 1e-12);
        assert_eq!(digitized.len() % 2, 0);
    }

    #[test]
    fn run_digitizes_all_channels() {
        use icerad_core::{SimChannel, SimStation, StationId};

        let det_station = StationDescription {
            id: StationId(51),
            name: None,
            position_m: [0.0, 0.0, -100.0],
            channels: vec![channel_with_adc()],
        };
        let mut station = SimStation::new(StationId(51));
        station.channels.push(SimChannel {
            id: ChannelId(0),
            trace: tone_trace(2.0, 1024, 0.5),
        });

        let mut adc = AnalogToDigitalConverter::new(9);
        adc.run(&mut station, &det_station, &AdcOptions::default())
            .unwrap();
        assert!((station.channels[0].trace.sampling_rate() - 0.5).abs() < 1e-12);
        let _ = adc.end();
    }

    #[test]
    fn deterministic_without_clock_offset() {
        let options = AdcOptions {
            random_clock_offset: false,
            ..AdcOptions::default()
        };
        let trace = tone_trace(2.0, 1024, 0.5);
        let mut a = AnalogToDigitalConverter::new(1);
        let mut b = AnalogToDigitalConverter::new(2);
        let (ta, _) = a.digital_trace(&trace, &channel_with_adc(), &options).unwrap();
        let (tb, _) = b.digital_trace(&trace, &channel_with_adc(), &options).unwrap();
        assert_eq!(ta.samples(), tb.samples());
    }
}
