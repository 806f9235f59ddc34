//! This Rust `embedded-hal`-based library is a simple way to control a [HD44780](https://en.wikipedia.org/wiki/Hitachi_HD44780_LCD_controller)
//! compatible character display wired behind a PCF8574 I2C "backpack" in an embedded, `no_std` environment.
//! These backpacks are ubiquitous on eBay and AliExpress and have no clear branding, but nearly all of them
//! share the same pinout: the expander's P0-P2 drive the controller's RS, R/W, and enable pins, P3 switches
//! the backlight transistor, and P4-P7 feed the controller's upper data lines. This library drives that
//! configuration through the controller's 4-bit interface.
//!
//! Key features include:
//! - Convenient high-level API for controlling the display
//! - Support for custom characters
//! - Backlight control
//! - `core::fmt::Write` implementation for easy use with the `write!` macro
//! - Compatible with the `embedded-hal` traits v1.0 and later
//! - Optional support for the `defmt` and `ufmt` logging frameworks
//!
//! ## Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! i2c-lcd-backpack = { version = "0.1", features = ["defmt"] }
//! ```
//! The `features = ["defmt"]` line is optional and enables the `defmt` feature, which allows the library's errors
//! to be used with the `defmt` logging framework. Another optional feature is `features = ["ufmt"]`, which enables
//! the `ufmt` feature, allowing the `uwriteln!` and `uwrite!` macros to be used.
//!
//! Then create a display for your geometry:
//! ```rust
//! use i2c_lcd_backpack::{LcdBackpack, LcdFont};
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::i2c::I2c;
//!
//! // board setup
//! let i2c = ...; // I2C peripheral
//! let delay = ...; // DelayNs implementation
//!
//! // 16 columns, 2 rows, at the default I2C address 0x27
//! let mut lcd = LcdBackpack::new(i2c, 16, 2, delay);
//! // or with the address the backpack's solder jumpers select
//! let mut lcd = LcdBackpack::new_with_address(i2c, 0x3F, 16, 2, delay);
//! // or a one-line display using the taller font
//! let mut lcd = LcdBackpack::new(i2c, 16, 1, delay).with_font(LcdFont::Dots5x10);
//! ```
//! Initialize the display:
//! ```rust
//! if let Err(e) = lcd.init() {
//!    panic!("Error initializing LCD: {}", e);
//! }
//! ```
//! Use the display:
//! ```rust
//! // set up the display
//! lcd.backlight(true)?.clear()?.home()?;
//! // print a message
//! lcd.print("Hello, world!")?;
//! // can also use the `core::fmt::write!` macro
//! use core::fmt::Write;
//!
//! write!(lcd, "Hello, world!")?;
//! ```
//! The various methods for controlling the LCD return a `Result` that wraps the display object in `Ok()`,
//! allowing for easy chaining of commands. For example:
//! ```rust
//! lcd.backlight(true)?.clear()?.home()?.print("Hello, world!")?;
//! ```
//! The optional `ufmt` feature enables the `ufmt` crate, which allows the `uwriteln!` and `uwrite!` macros to
//! be used with the display:
//! ```rust
//! use ufmt::uwriteln;
//!
//! uwriteln!(lcd, "Hello, world!")?;
//! ```
//!
//! ### Timing
//! The cheap backpacks do not wire the controller's busy flag back to the bus in any usable way, so this
//! library never reads from the display. Every write is instead followed by fixed delays long enough for the
//! slowest commands, using the `embedded-hal` `DelayNs` implementation the display was created with.
//!
#![no_std]
#![allow(dead_code)]
use core::fmt::Display;

use embedded_hal::{delay::DelayNs, i2c};

use adapter::Pcf8574Adapter;

/// Factory default I2C address of PCF8574 backpacks with no address jumpers
/// soldered.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x27;

// commands
const LCD_CMD_CLEARDISPLAY: u8 = 0x01; //  Clear display, set cursor position to zero
const LCD_CMD_RETURNHOME: u8 = 0x02; //  Set cursor position to zero
const LCD_CMD_ENTRYMODESET: u8 = 0x04; //  Sets the entry mode
const LCD_CMD_DISPLAYCONTROL: u8 = 0x08; //  Controls the display; does stuff like turning it off and on
const LCD_CMD_CURSORSHIFT: u8 = 0x10; //  Lets you move the cursor
const LCD_CMD_FUNCTIONSET: u8 = 0x20; //  Used to send the function to set to the display
const LCD_CMD_SETCGRAMADDR: u8 = 0x40; //  Used to set the CGRAM (character generator RAM) with characters
const LCD_CMD_SETDDRAMADDR: u8 = 0x80; //  Used to set the DDRAM (Display Data RAM)

// flags for display entry mode
const LCD_FLAG_ENTRYLEFT: u8 = 0x02; //  Used to set text to flow from left to right
const LCD_FLAG_ENTRYSHIFTINCREMENT: u8 = 0x01; //  Used to 'right justify' text from the cursor
const LCD_FLAG_ENTRYSHIFTDECREMENT: u8 = 0x00; //  Used to 'left justify' text from the cursor

// flags for display on/off control
const LCD_FLAG_DISPLAYON: u8 = 0x04; //  Turns the display on
const LCD_FLAG_CURSORON: u8 = 0x02; //  Turns the cursor on
const LCD_FLAG_CURSOROFF: u8 = 0x00; //  Turns the cursor off
const LCD_FLAG_BLINKON: u8 = 0x01; //  Turns on the blinking cursor
const LCD_FLAG_BLINKOFF: u8 = 0x00; //  Turns off the blinking cursor

// flags for display/cursor shift
const LCD_FLAG_DISPLAYMOVE: u8 = 0x08; //  Flag for moving the display
const LCD_FLAG_MOVERIGHT: u8 = 0x04; //  Flag for moving right
const LCD_FLAG_MOVELEFT: u8 = 0x00; //  Flag for moving left

// flags for function set
const LCD_FLAG_4BITMODE: u8 = 0x00; //  LCD 4 bit mode
const LCD_FLAG_2LINE: u8 = 0x08; //  LCD 2 line mode
const LCD_FLAG_1LINE: u8 = 0x00; //  LCD 1 line mode
const LCD_FLAG_5X10_DOTS: u8 = 0x04; //  10 pixel high font mode
const LCD_FLAG_5X8_DOTS: u8 = 0x00; //  8 pixel high font mode

// DDRAM start address of each row. The controller lays rows out the same way
// regardless of the configured geometry; rows two and three continue past the
// ends of rows zero and one.
const LCD_ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

mod adapter;

#[derive(Debug, PartialEq, Copy, Clone)]
/// Errors that can occur when using the LCD backpack
pub enum LcdBackpackError<I2C>
where
    I2C: i2c::I2c,
{
    /// I2C error returned from the underlying I2C implementation
    I2cError(I2C::Error),
    /// Formatting error
    FormattingError(core::fmt::Error),
}

impl<I2C> From<core::fmt::Error> for LcdBackpackError<I2C>
where
    I2C: i2c::I2c,
{
    fn from(err: core::fmt::Error) -> Self {
        LcdBackpackError::FormattingError(err)
    }
}

impl<I2C> From<&LcdBackpackError<I2C>> for &'static str
where
    I2C: i2c::I2c,
{
    fn from(err: &LcdBackpackError<I2C>) -> Self {
        match err {
            LcdBackpackError::I2cError(_) => "I2C error",
            LcdBackpackError::FormattingError(_) => "Formatting error",
        }
    }
}

#[cfg(feature = "defmt")]
impl<I2C> defmt::Format for LcdBackpackError<I2C>
where
    I2C: i2c::I2c,
{
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl<I2C> ufmt::uDisplay for LcdBackpackError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl<I2C> Display for LcdBackpackError<I2C>
where
    I2C: i2c::I2c,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// The character font the display is initialized with. Most displays only
/// support the 5x8 font; the controller honors the taller font on one-line
/// geometries only.
pub enum LcdFont {
    /// 5 by 8 dot character font
    Dots5x8,
    /// 5 by 10 dot character font, available on one-line displays
    Dots5x10,
}

impl From<&LcdFont> for &'static str {
    fn from(font: &LcdFont) -> Self {
        match font {
            LcdFont::Dots5x8 => "5x8",
            LcdFont::Dots5x10 => "5x10",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LcdFont {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for LcdFont {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for LcdFont {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

/// HD44780 based character display behind a PCF8574 I2C backpack. Owns the
/// I2C peripheral and a delay provider, and tracks the controller's three
/// mode registers so individual flags can be toggled without reading the
/// display back.
pub struct LcdBackpack<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    adapter: Pcf8574Adapter<I2C, DELAY>,
    display_function: u8,
    display_control: u8,
    display_mode: u8,
    cols: u8,
    rows: u8,
    font: LcdFont,
}

impl<I2C, DELAY> LcdBackpack<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    /// Create a new display object with the default I2C address for the
    /// backpack. `cols` and `rows` describe the physical geometry, e.g. 16x2
    /// or 20x4.
    pub fn new(i2c: I2C, cols: u8, rows: u8, delay: DELAY) -> Self {
        Self::new_with_address(i2c, DEFAULT_I2C_ADDRESS, cols, rows, delay)
    }

    /// Create a new display object with a specific I2C address for the
    /// backpack.
    pub fn new_with_address(i2c: I2C, address: u8, cols: u8, rows: u8, delay: DELAY) -> Self {
        Self {
            adapter: Pcf8574Adapter::new(i2c, address, delay),
            display_function: 0,
            display_control: 0,
            display_mode: 0,
            cols,
            rows,
            font: LcdFont::Dots5x8,
        }
    }

    /// Selects the font the display is initialized with. Call before `init`.
    pub fn with_font(mut self, font: LcdFont) -> Self {
        self.font = font;
        self
    }

    /// Initialize the display. This must be called before using the display.
    /// Runs the controller's 4-bit interface handshake, then configures the
    /// geometry and font, turns the display on with the cursor hidden, clears
    /// it, sets left-to-right entry mode, and homes the cursor.
    pub fn init(&mut self) -> Result<(), LcdBackpackError<I2C>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("Initializing HD44780 display");

        self.display_function = LCD_FLAG_4BITMODE | LCD_FLAG_1LINE | LCD_FLAG_5X8_DOTS;
        if self.rows > 1 {
            self.display_function |= LCD_FLAG_2LINE;
        }
        // the controller only honors the taller font on one-line displays
        if self.font == LcdFont::Dots5x10 && self.rows == 1 {
            self.display_function |= LCD_FLAG_5X10_DOTS;
        }

        // the controller needs 40 ms after its supply rises above the reset
        // threshold before it accepts commands
        self.adapter.delay().delay_ms(50);

        // settle the expander with every control line low before talking to
        // the controller
        self.adapter.write_backlight_state()?;
        self.adapter.delay().delay_ms(1000);

        // figure 24 of the HD44780 datasheet: three function-set nibbles put
        // the controller into 8-bit mode no matter which state it woke up in,
        // the fourth drops it to 4-bit operation
        self.adapter.write_nibble(false, 0x03)?;
        self.adapter.delay().delay_us(4500); // wait more than 4.1 ms
        self.adapter.write_nibble(false, 0x03)?;
        self.adapter.delay().delay_us(4500);
        self.adapter.write_nibble(false, 0x03)?;
        self.adapter.delay().delay_us(150);
        self.adapter.write_nibble(false, 0x02)?;

        // the interface is now 4-bit; set lines and font
        self.command(LCD_CMD_FUNCTIONSET | self.display_function)?;

        self.display_control = LCD_FLAG_DISPLAYON | LCD_FLAG_CURSOROFF | LCD_FLAG_BLINKOFF;
        self.command(LCD_CMD_DISPLAYCONTROL | self.display_control)?;

        self.clear()?;

        self.display_mode = LCD_FLAG_ENTRYLEFT | LCD_FLAG_ENTRYSHIFTDECREMENT;
        self.command(LCD_CMD_ENTRYMODESET | self.display_mode)?;

        self.home()?;

        Ok(())
    }

    /// returns a reference to the I2C peripheral. mostly needed for testing
    fn i2c(&mut self) -> &mut I2C {
        self.adapter.i2c()
    }

    /// Returns the number of columns the display was created with.
    pub fn cols(&self) -> u8 {
        self.cols
    }

    /// Returns the number of rows the display was created with.
    pub fn rows(&self) -> u8 {
        self.rows
    }

    //--------------------------------------------------------------------------------------------------
    // mid level commands, for sending data/cmds
    //--------------------------------------------------------------------------------------------------

    /// Sends a command byte to the controller's instruction register.
    fn command(&mut self, value: u8) -> Result<(), LcdBackpackError<I2C>> {
        self.adapter.write_byte(false, value)
    }

    /// Sends a byte to the controller's data register.
    fn write_data(&mut self, value: u8) -> Result<(), LcdBackpackError<I2C>> {
        self.adapter.write_byte(true, value)
    }

    //--------------------------------------------------------------------------------------------------
    // high level commands, for the user!
    //--------------------------------------------------------------------------------------------------

    /// Clear the display
    pub fn clear(&mut self) -> Result<&mut Self, LcdBackpackError<I2C>> {
        self.command(LCD_CMD_CLEARDISPLAY)?;
        // clearing takes the controller longer than any other command
        self.adapter.delay().delay_ms(2);
        Ok(self)
    }

    /// Set the cursor to the home position.
    pub fn home(&mut self) -> Result<&mut Self, LcdBackpackError<I2C>> {
        self.command(LCD_CMD_RETURNHOME)?;
        // homing un-shifts the display and is as slow as clearing it
        self.adapter.delay().delay_ms(2);
        Ok(self)
    }

    /// Set the cursor position at specified column and row. Columns and rows
    /// are zero-indexed. Rows past the end of the display are clamped to the
    /// last row; columns are not validated.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> Result<&mut Self, LcdBackpackError<I2C>> {
        let row = row
            .min(self.rows.saturating_sub(1))
            .min(LCD_ROW_OFFSETS.len() as u8 - 1);
        self.command(LCD_CMD_SETDDRAMADDR | col.wrapping_add(LCD_ROW_OFFSETS[row as usize]))?;
        Ok(self)
    }

    /// Set the cursor visibility.
    pub fn show_cursor(&mut self, show_cursor: bool) -> Result<&mut Self, LcdBackpackError<I2C>> {
        if show_cursor {
            self.display_control |= LCD_FLAG_CURSORON;
        } else {
            self.display_control &= !LCD_FLAG_CURSORON;
        }
        self.command(LCD_CMD_DISPLAYCONTROL | self.display_control)?;
        Ok(self)
    }

    /// Set the cursor blinking.
    pub fn blink_cursor(&mut self, blink_cursor: bool) -> Result<&mut Self, LcdBackpackError<I2C>> {
        if blink_cursor {
            self.display_control |= LCD_FLAG_BLINKON;
        } else {
            self.display_control &= !LCD_FLAG_BLINKON;
        }
        self.command(LCD_CMD_DISPLAYCONTROL | self.display_control)?;
        Ok(self)
    }

    /// Set the display visibility.
    pub fn show_display(&mut self, show_display: bool) -> Result<&mut Self, LcdBackpackError<I2C>> {
        if show_display {
            self.display_control |= LCD_FLAG_DISPLAYON;
        } else {
            self.display_control &= !LCD_FLAG_DISPLAYON;
        }
        self.command(LCD_CMD_DISPLAYCONTROL | self.display_control)?;
        Ok(self)
    }

    /// Scroll the display to the left.
    pub fn scroll_display_left(&mut self) -> Result<&mut Self, LcdBackpackError<I2C>> {
        self.command(LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVELEFT)?;
        Ok(self)
    }

    /// Scroll the display to the right.
    pub fn scroll_display_right(&mut self) -> Result<&mut Self, LcdBackpackError<I2C>> {
        self.command(LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVERIGHT)?;
        Ok(self)
    }

    /// Set the text flow direction to left to right.
    pub fn left_to_right(&mut self) -> Result<&mut Self, LcdBackpackError<I2C>> {
        self.display_mode |= LCD_FLAG_ENTRYLEFT;
        self.command(LCD_CMD_ENTRYMODESET | self.display_mode)?;
        Ok(self)
    }

    /// Set the text flow direction to right to left.
    pub fn right_to_left(&mut self) -> Result<&mut Self, LcdBackpackError<I2C>> {
        self.display_mode &= !LCD_FLAG_ENTRYLEFT;
        self.command(LCD_CMD_ENTRYMODESET | self.display_mode)?;
        Ok(self)
    }

    /// Set the auto scroll mode.
    pub fn autoscroll(&mut self, autoscroll: bool) -> Result<&mut Self, LcdBackpackError<I2C>> {
        if autoscroll {
            self.display_mode |= LCD_FLAG_ENTRYSHIFTINCREMENT;
        } else {
            self.display_mode &= !LCD_FLAG_ENTRYSHIFTINCREMENT;
        }
        self.command(LCD_CMD_ENTRYMODESET | self.display_mode)?;
        Ok(self)
    }

    /// Create a new custom character in one of the controller's eight CGRAM
    /// slots. `location` is masked to 0..=7; `charmap` holds the eight pixel
    /// rows of the character, top first.
    pub fn create_char(
        &mut self,
        location: u8,
        charmap: [u8; 8],
    ) -> Result<&mut Self, LcdBackpackError<I2C>> {
        self.command(LCD_CMD_SETCGRAMADDR | ((location & 0x7) << 3))?;
        for &charmap_byte in charmap.iter() {
            self.write_data(charmap_byte)?;
        }
        Ok(self)
    }

    /// Prints a string to the LCD at the current cursor position.
    pub fn print(&mut self, text: &str) -> Result<&mut Self, LcdBackpackError<I2C>> {
        for &byte in text.as_bytes() {
            self.write_data(byte)?;
        }
        Ok(self)
    }

    /// Turn the backlight on or off. The change is written to the expander
    /// immediately rather than riding along with the next command.
    pub fn backlight(&mut self, on: bool) -> Result<&mut Self, LcdBackpackError<I2C>> {
        self.adapter.set_backlight(on)?;
        Ok(self)
    }
}

/// Implement the `core::fmt::Write` trait for the LCD backpack, allowing it
/// to be used with the `write!` macro.
impl<I2C, DELAY> core::fmt::Write for LcdBackpack<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
        if let Err(_e) = self.print(s) {
            return Err(core::fmt::Error);
        }
        Ok(())
    }
}

#[cfg(feature = "ufmt")]
/// Implement the `ufmt::uWrite` trait for the LCD backpack, allowing it to be
/// used with the `uwriteln!` and `uwrite!` macros.
impl<I2C, DELAY> ufmt::uWrite for LcdBackpack<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), LcdBackpackError<I2C>> {
        if let Err(e) = self.print(s) {
            return Err(e);
        }
        Ok(())
    }

    type Error = LcdBackpackError<I2C>;
}
