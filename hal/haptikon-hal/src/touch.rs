//! Raw touch sensing abstractions
//!
//! A resistive panel is read one quantity at a time: the implementation
//! drives the shared X/Y plate pins for the requested axis, waits for the
//! lines to settle, and runs an ADC conversion. This trait hides the pin
//! multiplexing behind three plain reads.

/// Full scale of the raw counts produced by [`TouchSense`] reads
pub const RAW_ADC_MAX: u16 = 4095;

/// Raw touch sensing for a single-point resistive panel
///
/// Implementations own the plate multiplexing and ADC conversion for the
/// specific chip. Readings are unitless counts in `0..=RAW_ADC_MAX`; they
/// are only meaningful while the panel is pressed hard enough, which the
/// pressure read decides.
pub trait TouchSense {
    /// Read the raw X-axis position counts
    ///
    /// Takes `&mut self` because the read reconfigures the shared plate
    /// pins before the conversion.
    fn read_raw_x(&mut self) -> u16;

    /// Read the raw Y-axis position counts
    fn read_raw_y(&mut self) -> u16;

    /// Read the raw contact pressure counts
    ///
    /// Higher counts mean firmer contact. Readings at or below the
    /// configured pressure threshold are treated as "no touch".
    fn read_raw_z(&mut self) -> u16;
}
