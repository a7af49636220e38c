//! Panel rendering and the interactive settings menu.

use core::fmt::Write as _;

use embedded_graphics::{
    mono_font::{
        MonoTextStyle,
        ascii::{FONT_6X10, FONT_9X15, FONT_10X20},
    },
    prelude::*,
    text::Text,
};
use embedded_hal::spi::SpiDevice;
use epd_waveshare::{
    color::Color,
    epd4in2::{Display4in2, Epd4in2},
    prelude::*,
};
use esp_hal::{
    delay::Delay,
    gpio::{Input, Output},
};
use everclock_core::{
    drivers::{ButtonInput, ClockView, MenuOutcome, RtcTime, WakeUi},
    settings::{BUZZER_VOLUME_MAX, SettingsRecord},
};
use heapless::String;

const MENU_POLL_MS: u32 = 50;
const MENU_IDLE_TIMEOUT_MS: u32 = 20_000;

/// Indexed by `year % 12`; 2016 was a Monkey year.
const ZODIAC: [&str; 12] = [
    "Monkey", "Rooster", "Dog", "Pig", "Rat", "Ox", "Tiger", "Rabbit", "Dragon", "Snake", "Horse",
    "Goat",
];

/// Indexed by `weekday - 1`, Monday first.
const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Clone, Copy, Eq, PartialEq)]
enum MenuField {
    Hours,
    Minutes,
    Volume,
    BuzzerOn,
}

impl MenuField {
    fn next(self) -> Option<Self> {
        match self {
            Self::Hours => Some(Self::Minutes),
            Self::Minutes => Some(Self::Volume),
            Self::Volume => Some(Self::BuzzerOn),
            Self::BuzzerOn => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Hours => "Hour",
            Self::Minutes => "Minute",
            Self::Volume => "Volume",
            Self::BuzzerOn => "Buzzer",
        }
    }
}

pub struct EpdUi<SPI, BTN>
where
    SPI: SpiDevice,
    BTN: ButtonInput,
{
    spi: SPI,
    epd: Epd4in2<SPI, Input<'static>, Output<'static>, Output<'static>, Delay>,
    display: Display4in2,
    delay: Delay,
    buttons: BTN,
}

impl<SPI, BTN> EpdUi<SPI, BTN>
where
    SPI: SpiDevice,
    BTN: ButtonInput,
{
    pub fn new(
        mut spi: SPI,
        busy: Input<'static>,
        dc: Output<'static>,
        rst: Output<'static>,
        buttons: BTN,
    ) -> Result<Self, SPI::Error> {
        let mut delay = Delay::new();
        let epd = Epd4in2::new(&mut spi, busy, dc, rst, &mut delay, None)?;
        Ok(Self {
            spi,
            epd,
            display: Display4in2::default(),
            delay,
            buttons,
        })
    }

    fn flush(&mut self) -> Result<(), SPI::Error> {
        self.epd
            .update_and_display_frame(&mut self.spi, self.display.buffer(), &mut self.delay)
    }

    fn text(&mut self, text: &str, x: i32, y: i32, style: MonoTextStyle<'static, Color>) {
        // Drawing into the in-memory frame cannot fail.
        let _ = Text::new(text, Point::new(x, y), style).draw(&mut self.display);
    }

    fn draw_clock(&mut self, view: &ClockView) {
        let big = MonoTextStyle::new(&FONT_10X20, Color::Black);
        let medium = MonoTextStyle::new(&FONT_9X15, Color::Black);
        let small = MonoTextStyle::new(&FONT_6X10, Color::Black);
        let _ = self.display.clear(Color::White);

        let time = &view.time;
        let mut line: String<48> = String::new();
        if time.twelve_hour {
            let _ = write!(
                line,
                "{:02}:{:02} {}",
                time.hours,
                time.minutes,
                if time.pm { "PM" } else { "AM" }
            );
        } else {
            let _ = write!(line, "{:02}:{:02}", time.hours, time.minutes);
        }
        self.text(&line, 140, 80, big);

        line.clear();
        let weekday = WEEKDAYS
            .get(time.weekday.wrapping_sub(1) as usize)
            .copied()
            .unwrap_or("???");
        let _ = write!(
            line,
            "{:04}-{:02}-{:02} {}",
            time.year, time.month, time.day, weekday
        );
        self.text(&line, 100, 130, medium);

        if let Some(lunar) = &view.lunar {
            line.clear();
            let _ = write!(line, "Lunar {}/{}", lunar.month, lunar.day);
            if lunar.is_leap_month {
                let _ = write!(line, " (leap)");
            }
            let _ = write!(line, "  {}", ZODIAC[lunar.zodiac_index() as usize]);
            self.text(&line, 100, 160, medium);
        }

        if let Some(reading) = &view.sensor {
            line.clear();
            let _ = write!(line, "{:.1} C   {:.0} %RH", reading.celsius, reading.humidity);
            self.text(&line, 100, 200, medium);
        }

        if let Some(volts) = view.battery_volts {
            line.clear();
            let _ = write!(line, "bat {volts:.2} V");
            self.text(&line, 8, 290, small);
        }
        if view.low_battery_warning {
            self.text("LOW BATTERY", 300, 290, small);
        }
    }

    fn draw_menu(&mut self, field: MenuField, settings: &SettingsRecord, time: &RtcTime) {
        let medium = MonoTextStyle::new(&FONT_9X15, Color::Black);
        let _ = self.display.clear(Color::White);
        self.text("Settings", 150, 40, medium);
        self.text("UP/DOWN adjust, SET next", 80, 270, medium);

        let fields = [
            (MenuField::Hours, time.hours as i32),
            (MenuField::Minutes, time.minutes as i32),
            (MenuField::Volume, settings.buzzer_volume as i32),
            (MenuField::BuzzerOn, settings.buzzer_enabled as i32),
        ];
        for (row, (item, value)) in fields.iter().enumerate() {
            let mut line: String<32> = String::new();
            let marker = if *item == field { '>' } else { ' ' };
            match item {
                MenuField::BuzzerOn => {
                    let _ = write!(
                        line,
                        "{} {:<7} {}",
                        marker,
                        item.label(),
                        if *value != 0 { "on" } else { "off" }
                    );
                }
                _ => {
                    let _ = write!(line, "{} {:<7} {:2}", marker, item.label(), value);
                }
            }
            self.text(&line, 120, 90 + 30 * row as i32, medium);
        }
    }

    fn adjust(field: MenuField, up: bool, settings: &mut SettingsRecord, time: &mut RtcTime) {
        match field {
            MenuField::Hours => {
                time.hours = if up {
                    (time.hours + 1) % 24
                } else {
                    (time.hours + 23) % 24
                };
                time.seconds = 0;
            }
            MenuField::Minutes => {
                time.minutes = if up {
                    (time.minutes + 1) % 60
                } else {
                    (time.minutes + 59) % 60
                };
                time.seconds = 0;
            }
            MenuField::Volume => {
                settings.buzzer_volume = if up {
                    (settings.buzzer_volume + 1).min(BUZZER_VOLUME_MAX)
                } else {
                    settings.buzzer_volume.saturating_sub(1).max(1)
                };
            }
            MenuField::BuzzerOn => settings.buzzer_enabled = !settings.buzzer_enabled,
        }
    }
}

impl<SPI, BTN> WakeUi for EpdUi<SPI, BTN>
where
    SPI: SpiDevice,
    BTN: ButtonInput,
{
    type Error = SPI::Error;

    fn show_clock(&mut self, view: &ClockView) -> Result<(), Self::Error> {
        self.draw_clock(view);
        self.flush()
    }

    fn show_guide(&mut self) -> Result<(), Self::Error> {
        let medium = MonoTextStyle::new(&FONT_9X15, Color::Black);
        let _ = self.display.clear(Color::White);
        self.text("Clock reinitialized", 120, 100, medium);
        self.text("Hold SET on wake to open settings", 50, 140, medium);
        self.text("UP refreshes the display", 90, 170, medium);
        self.flush()
    }

    fn show_low_battery(&mut self) -> Result<(), Self::Error> {
        let big = MonoTextStyle::new(&FONT_10X20, Color::Black);
        let _ = self.display.clear(Color::White);
        self.text("BATTERY EMPTY", 120, 140, big);
        self.text("replace battery", 135, 180, MonoTextStyle::new(&FONT_9X15, Color::Black));
        self.flush()?;
        // Leave the panel asleep; nothing will repaint until a power cycle.
        self.epd.sleep(&mut self.spi, &mut self.delay)
    }

    fn run_menu(
        &mut self,
        settings: &mut SettingsRecord,
        time: &mut RtcTime,
    ) -> Result<MenuOutcome, Self::Error> {
        let mut outcome = MenuOutcome::default();
        let mut field = MenuField::Hours;
        let mut idle_ms = 0u32;
        let mut prev = self.buttons.read().unwrap_or_default();

        self.draw_menu(field, settings, time);
        self.flush()?;

        loop {
            self.delay.delay_millis(MENU_POLL_MS);
            idle_ms += MENU_POLL_MS;
            if idle_ms >= MENU_IDLE_TIMEOUT_MS {
                break;
            }

            let levels = self.buttons.read().unwrap_or_default();
            let up_edge = levels.up && !prev.up;
            let down_edge = levels.down && !prev.down;
            let set_edge = levels.set && !prev.set;
            prev = levels;
            if !(up_edge || down_edge || set_edge) {
                continue;
            }
            idle_ms = 0;

            if set_edge {
                match field.next() {
                    Some(next) => field = next,
                    None => break,
                }
            } else {
                Self::adjust(field, up_edge, settings, time);
                match field {
                    MenuField::Hours | MenuField::Minutes => outcome.time_changed = true,
                    MenuField::Volume | MenuField::BuzzerOn => outcome.settings_changed = true,
                }
            }
            self.draw_menu(field, settings, time);
            self.flush()?;
        }

        Ok(outcome)
    }

    fn sleep_panel(&mut self) -> Result<(), Self::Error> {
        self.epd.sleep(&mut self.spi, &mut self.delay)
    }
}
