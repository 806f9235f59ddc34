use bitfield::bitfield;
use embedded_hal::{delay::DelayNs, i2c};

use crate::LcdBackpackError;

// Pin assignment for the common PCF8574 LCD backpack. The expander's eight
// GPIO lines drive the controller's RS, R/W, and enable pins, the backlight
// transistor, and the upper four data lines.
bitfield! {
    pub struct Pcf8574BitField(u8);
    impl Debug;
    pub rs, set_rs: 0, 0;
    pub rw, set_rw: 1, 1;
    pub enable, set_enable: 2, 2;
    pub backlight, set_backlight: 3, 3;
    pub data, set_data: 7, 4;
}

/// Transport for an HD44780 controller wired behind a PCF8574 I2C GPIO
/// expander in the 4-bit configuration. All traffic is single-byte writes of
/// the assembled pin state; the controller's read path is not wired up on
/// these backpacks, so timing is handled with fixed delays.
pub struct Pcf8574Adapter<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    i2c: I2C,
    address: u8,
    delay: DELAY,
    bits: Pcf8574BitField,
}

impl<I2C, DELAY> Pcf8574Adapter<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    /// Creates an adapter for the expander at `address`. The backlight bit is
    /// set from the start, so it rides along with every byte written.
    pub fn new(i2c: I2C, address: u8, delay: DELAY) -> Self {
        let mut bits = Pcf8574BitField(0);
        bits.set_backlight(1);
        Self {
            i2c,
            address,
            delay,
            bits,
        }
    }

    /// Sends a full byte to the controller as two nibbles, high nibble first.
    pub fn write_byte(&mut self, rs_setting: bool, value: u8) -> Result<(), LcdBackpackError<I2C>> {
        self.write_nibble(rs_setting, value >> 4)?;
        self.write_nibble(rs_setting, value & 0x0F)
    }

    /// Presents the low four bits of `value` on the controller's data lines
    /// and strobes them in. Used directly during initialization, when the
    /// controller is still in 8-bit mode and single nibbles must go out.
    pub fn write_nibble(
        &mut self,
        rs_setting: bool,
        value: u8,
    ) -> Result<(), LcdBackpackError<I2C>> {
        self.bits.set_rs(rs_setting as u8);
        self.bits.set_rw(0);
        self.bits.set_data(value & 0x0F);
        self.bits.set_enable(0);
        self.write_expander()?;
        self.pulse_enable()
    }

    /// Turns the backlight on or off. Takes effect immediately rather than on
    /// the next controller write.
    pub fn set_backlight(&mut self, on: bool) -> Result<(), LcdBackpackError<I2C>> {
        self.bits.set_backlight(on as u8);
        self.write_backlight_state()
    }

    /// Writes the current backlight state to the expander with every other
    /// GPIO line forced low. The controller ignores the write; the backlight
    /// transistor does not.
    pub fn write_backlight_state(&mut self) -> Result<(), LcdBackpackError<I2C>> {
        let backlight = self.bits.backlight();
        self.bits = Pcf8574BitField(0);
        self.bits.set_backlight(backlight);
        self.write_expander()
    }

    /// Returns a mutable reference to the delay provider.
    pub fn delay(&mut self) -> &mut DELAY {
        &mut self.delay
    }

    /// Returns a mutable reference to the I2C peripheral. Mostly needed for
    /// testing.
    pub fn i2c(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    /// Writes the assembled pin state to the expander, then waits out the
    /// fixed per-write settle time.
    fn write_expander(&mut self) -> Result<(), LcdBackpackError<I2C>> {
        self.i2c
            .write(self.address, &[self.bits.0])
            .map_err(LcdBackpackError::I2cError)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    /// Strobes the enable line. The controller latches the data lines on the
    /// falling edge, so this writes the pin state once with enable high and
    /// once with it low again.
    fn pulse_enable(&mut self) -> Result<(), LcdBackpackError<I2C>> {
        self.bits.set_enable(1);
        self.write_expander()?;
        self.delay.delay_us(1); // enable pulse must be wider than 450 ns
        self.bits.set_enable(0);
        self.write_expander()?;
        self.delay.delay_us(50); // commands need more than 37 us to settle
        Ok(())
    }
}
