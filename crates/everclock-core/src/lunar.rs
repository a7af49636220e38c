//! Solar to lunisolar calendar conversion over packed multi-century tables.
//!
//! The tables encode, for each lunar year, the solar date of its new year and
//! the lengths of its (up to 13) months. Everything here is a pure function of
//! the input date; all bit-field decoding stays inside this module.

/// Lunar year described by index 0 of both tables.
const TABLE_FIRST_YEAR: u16 = 1998;
const TABLE_YEARS: usize = 203;

/// Earliest solar year `solar_to_lunar` accepts. The conversion looks up the
/// lunar new year of the input year or the one before it, so the usable span
/// is narrower than the raw tables.
pub const MIN_SOLAR_YEAR: u16 = TABLE_FIRST_YEAR + 2;
/// Latest solar year `solar_to_lunar` accepts.
pub const MAX_SOLAR_YEAR: u16 = TABLE_FIRST_YEAR + TABLE_YEARS as u16 - 2;

/// Solar date of each year's lunar new year, packed as year:12 month:4 day:5.
const LUNAR_NEW_YEAR: [u32; TABLE_YEARS] = [
    0x0F9C3C, 0x0F9E50, 0x0FA045, 0x0FA238, 0x0FA44C, 0x0FA641, 0x0FA836, 0x0FAA49,
    0x0FAC3D, 0x0FAE52, 0x0FB047, 0x0FB23A, 0x0FB44E, 0x0FB643, 0x0FB837, 0x0FBA4A,
    0x0FBC3F, 0x0FBE53, 0x0FC048, 0x0FC23C, 0x0FC450, 0x0FC645, 0x0FC839, 0x0FCA4C,
    0x0FCC41, 0x0FCE36, 0x0FD04A, 0x0FD23D, 0x0FD451, 0x0FD646, 0x0FD83A, 0x0FDA4D,
    0x0FDC43, 0x0FDE37, 0x0FE04B, 0x0FE23F, 0x0FE453, 0x0FE648, 0x0FE83C, 0x0FEA4F,
    0x0FEC44, 0x0FEE38, 0x0FF04C, 0x0FF241, 0x0FF436, 0x0FF64A, 0x0FF83E, 0x0FFA51,
    0x0FFC46, 0x0FFE3A, 0x10004E, 0x100242, 0x100437, 0x10064B, 0x100841, 0x100A53,
    0x100C48, 0x100E3C, 0x10104F, 0x101244, 0x101438, 0x10164C, 0x101842, 0x101A35,
    0x101C49, 0x101E3D, 0x102051, 0x102245, 0x10243A, 0x10264E, 0x102843, 0x102A37,
    0x102C4B, 0x102E3F, 0x103053, 0x103247, 0x10343B, 0x10364F, 0x103845, 0x103A38,
    0x103C4C, 0x103E42, 0x104036, 0x104249, 0x10443D, 0x104651, 0x104846, 0x104A3A,
    0x104C4E, 0x104E43, 0x105038, 0x10524A, 0x10543E, 0x105652, 0x105847, 0x105A3B,
    0x105C4F, 0x105E45, 0x106039, 0x10624C, 0x106441, 0x106635, 0x106849, 0x106A3D,
    0x106C51, 0x106E47, 0x10703C, 0x10724F, 0x107444, 0x107638, 0x10784C, 0x107A3F,
    0x107C53, 0x107E48, 0x10803D, 0x108250, 0x108446, 0x10863A, 0x10884E, 0x108A42,
    0x108C36, 0x108E4A, 0x10903E, 0x109251, 0x109447, 0x10963B, 0x10984F, 0x109A43,
    0x109C37, 0x109E4B, 0x10A041, 0x10A253, 0x10A448, 0x10A63D, 0x10A851, 0x10AA45,
    0x10AC39, 0x10AE4D, 0x10B042, 0x10B236, 0x10B44A, 0x10B63E, 0x10B852, 0x10BA47,
    0x10BC3B, 0x10BE4F, 0x10C044, 0x10C237, 0x10C44B, 0x10C641, 0x10C854, 0x10CA48,
    0x10CC3D, 0x10CE50, 0x10D045, 0x10D239, 0x10D44C, 0x10D642, 0x10D837, 0x10DA4A,
    0x10DC3E, 0x10DE52, 0x10E047, 0x10E23A, 0x10E44E, 0x10E643, 0x10E838, 0x10EA4B,
    0x10EC41, 0x10EE54, 0x10F049, 0x10F23C, 0x10F450, 0x10F645, 0x10F839, 0x10FA4C,
    0x10FC42, 0x10FE37, 0x11004B, 0x11023E, 0x110452, 0x110647, 0x11083B, 0x110A4E,
    0x110C43, 0x110E38, 0x11104C, 0x11123F, 0x111435, 0x111648, 0x11183C, 0x111A4F,
    0x111C45, 0x111E39, 0x11204D, 0x112242, 0x112436, 0x11264A, 0x11283E, 0x112A51,
    0x112C46, 0x112E3B, 0x11304F,
];

/// Month lengths per lunar year: bits 12..=0 flag 30-day months (bit 12 is the
/// first month), bits 16..=13 hold the leap-month ordinal (0 = no leap month).
const MONTH_TABLE: [u32; TABLE_YEARS] = [
    0x0B26D, 0x0125C, 0x0192C, 0x09A95, 0x01A94, 0x01B4A, 0x04B55, 0x00AD4,
    0x0F55B, 0x004BA, 0x0125A, 0x0B92B, 0x0152A, 0x01694, 0x096AA, 0x015AA,
    0x12AB5, 0x00974, 0x014B6, 0x0CA57, 0x00A56, 0x01526, 0x08E95, 0x00D54,
    0x015AA, 0x049B5, 0x0096C, 0x0D4AE, 0x0149C, 0x01A4C, 0x0BD26, 0x01AA6,
    0x00B54, 0x06D6A, 0x012DA, 0x1695D, 0x0095A, 0x0149A, 0x0DA4B, 0x01A4A,
    0x01AA4, 0x0BB54, 0x016B4, 0x00ADA, 0x0495B, 0x00936, 0x0F497, 0x01496,
    0x0154A, 0x0B6A5, 0x00DA4, 0x015B4, 0x06AB6, 0x0126E, 0x1092F, 0x0092E,
    0x00C96, 0x0CD4A, 0x01D4A, 0x00D64, 0x0956C, 0x0155C, 0x0125C, 0x0792E,
    0x0192C, 0x0FA95, 0x01A94, 0x01B4A, 0x0AB55, 0x00AD4, 0x014DA, 0x08A5D,
    0x00A5A, 0x1152B, 0x0152A, 0x01694, 0x0D6AA, 0x015AA, 0x00AB4, 0x094BA,
    0x014B6, 0x00A56, 0x07527, 0x00D26, 0x0EE53, 0x00D54, 0x015AA, 0x0A9B5,
    0x0096C, 0x014AE, 0x08A4E, 0x01A4C, 0x11D26, 0x01AA4, 0x01B54, 0x0CD6A,
    0x00ADA, 0x0095C, 0x0949D, 0x0149A, 0x01A2A, 0x05B25, 0x01AA4, 0x0FB52,
    0x016B4, 0x00ABA, 0x0A95B, 0x00936, 0x01496, 0x09A4B, 0x0154A, 0x136A5,
    0x00DA4, 0x015AC, 0x0CAB6, 0x0126E, 0x0092E, 0x08C97, 0x00A96, 0x00D4A,
    0x06DA5, 0x00D54, 0x0F56A, 0x0155A, 0x00A5C, 0x0B92E, 0x0152C, 0x01A94,
    0x09D4A, 0x01B2A, 0x16B55, 0x00AD4, 0x014DA, 0x0CA5D, 0x00A5A, 0x0151A,
    0x0BA95, 0x01654, 0x016AA, 0x04AD5, 0x00AB4, 0x0F4BA, 0x014B6, 0x00A56,
    0x0B517, 0x00D16, 0x00E52, 0x096AA, 0x00D6A, 0x165B5, 0x0096C, 0x014AE,
    0x0CA2E, 0x01A2C, 0x01D16, 0x0AD52, 0x01B52, 0x00B6A, 0x0656D, 0x0055C,
    0x0F45D, 0x0145A, 0x01A2A, 0x0DA95, 0x016A4, 0x01AD2, 0x08B5A, 0x00AB6,
    0x1455B, 0x008B6, 0x01456, 0x0D52B, 0x0152A, 0x01694, 0x0B6AA, 0x015AA,
    0x00AB6, 0x064B7, 0x008AE, 0x0EC57, 0x00A56, 0x00D2A, 0x0CD95, 0x00B54,
    0x0156A, 0x08A6D, 0x0095C, 0x014AE, 0x04A56, 0x01A54, 0x0DD2A, 0x01AAA,
    0x00B54, 0x0B56A, 0x014DA, 0x0095C, 0x074AB, 0x0149A, 0x0FA4B, 0x01652,
    0x016AA, 0x0CAD5, 0x005B4,
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LunarError {
    /// Input date falls outside the tabulated span or the nominal field ranges.
    OutOfRange,
}

/// Lunisolar date. A leap month repeats the preceding month's number, so
/// `month` stays in 1..=12 and `is_leap_month` disambiguates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LunarDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub is_leap_month: bool,
}

impl LunarDate {
    /// Index into the twelve-animal zodiac cycle.
    pub const fn zodiac_index(&self) -> u8 {
        (self.year % 12) as u8
    }

    pub const fn heavenly_stem_index(&self) -> u8 {
        (self.year % 10) as u8
    }

    pub const fn earthly_branch_index(&self) -> u8 {
        (self.year % 12) as u8
    }
}

const fn new_year_year(entry: u32) -> u16 {
    ((entry >> 9) & 0xFFF) as u16
}

const fn new_year_month(entry: u32) -> u8 {
    ((entry >> 5) & 0x0F) as u8
}

const fn new_year_day(entry: u32) -> u8 {
    (entry & 0x1F) as u8
}

const fn leap_month_of(entry: u32) -> u8 {
    ((entry >> 13) & 0x0F) as u8
}

/// Length in days of the `month_index`-th (0-based) month of a lunar year.
const fn month_days(entry: u32, month_index: u8) -> u16 {
    if entry & (1 << (12 - month_index as u32)) != 0 {
        30
    } else {
        29
    }
}

/// Absolute day number of a proleptic Gregorian date. Months are shifted so
/// the year starts in March, which pushes the leap day to the year's end and
/// keeps the day-count formula uniform.
const fn solar_day_number(year: u16, month: u8, day: u8) -> i64 {
    let m = (month as i64 + 9) % 12;
    let y = year as i64 - m / 10;
    365 * y + y / 4 - y / 100 + y / 400 + (m * 306 + 5) / 10 + (day as i64 - 1)
}

/// Converts a Gregorian date to its lunisolar equivalent.
///
/// Bounds are checked before any table access; out-of-range input never
/// touches the tables.
pub fn solar_to_lunar(year: u16, month: u8, day: u8) -> Result<LunarDate, LunarError> {
    if month < 1
        || month > 12
        || day < 1
        || day > 31
        || year < MIN_SOLAR_YEAR
        || year > MAX_SOLAR_YEAR
    {
        return Err(LunarError::OutOfRange);
    }

    // Lunar new year on or before the input date: this solar year's entry, or
    // the previous one when the input falls before new year's day.
    let mut index = (year - TABLE_FIRST_YEAR) as usize;
    let packed_input = (year as u32) << 9 | (month as u32) << 5 | day as u32;
    if LUNAR_NEW_YEAR[index] > packed_input {
        index -= 1;
    }

    let new_year = LUNAR_NEW_YEAR[index];
    let first_day = solar_day_number(
        new_year_year(new_year),
        new_year_month(new_year),
        new_year_day(new_year),
    );
    let mut offset = (solar_day_number(year, month, day) - first_day + 1) as u16;

    let months = MONTH_TABLE[index];
    let mut ordinal: u8 = 1;
    for month_index in 0..13u8 {
        let len = month_days(months, month_index);
        if offset > len {
            ordinal += 1;
            offset -= len;
        } else {
            break;
        }
    }

    // A leap month shares the number of the month before it.
    let leap_month = leap_month_of(months);
    let mut is_leap_month = false;
    if leap_month != 0 && ordinal > leap_month {
        is_leap_month = ordinal == leap_month + 1;
        ordinal -= 1;
    }

    Ok(LunarDate {
        year: TABLE_FIRST_YEAR + index as u16,
        month: ordinal,
        day: offset as u8,
        is_leap_month,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mid_autumn_2020_matches_reference_calendar() {
        // Solar 2020-10-01 (a Thursday) was the Mid-Autumn Festival.
        let lunar = solar_to_lunar(2020, 10, 1).unwrap();
        assert_eq!(
            lunar,
            LunarDate {
                year: 2020,
                month: 8,
                day: 15,
                is_leap_month: false,
            }
        );
    }

    #[test]
    fn new_year_day_is_first_of_first_month() {
        let lunar = solar_to_lunar(2021, 2, 12).unwrap();
        assert_eq!(
            lunar,
            LunarDate {
                year: 2021,
                month: 1,
                day: 1,
                is_leap_month: false,
            }
        );
    }

    #[test]
    fn date_before_new_year_belongs_to_previous_lunar_year() {
        let lunar = solar_to_lunar(2021, 1, 1).unwrap();
        assert_eq!(
            lunar,
            LunarDate {
                year: 2020,
                month: 11,
                day: 18,
                is_leap_month: false,
            }
        );
    }

    #[test]
    fn leap_fourth_month_2020() {
        let lunar = solar_to_lunar(2020, 5, 23).unwrap();
        assert_eq!(
            lunar,
            LunarDate {
                year: 2020,
                month: 4,
                day: 1,
                is_leap_month: true,
            }
        );
    }

    #[test]
    fn leap_second_month_2023() {
        let lunar = solar_to_lunar(2023, 3, 22).unwrap();
        assert_eq!(
            lunar,
            LunarDate {
                year: 2023,
                month: 2,
                day: 1,
                is_leap_month: true,
            }
        );
    }

    #[test]
    fn rejects_years_outside_supported_span() {
        assert_eq!(solar_to_lunar(1999, 6, 1), Err(LunarError::OutOfRange));
        assert_eq!(
            solar_to_lunar(MIN_SOLAR_YEAR - 1, 1, 1),
            Err(LunarError::OutOfRange)
        );
        assert_eq!(
            solar_to_lunar(MAX_SOLAR_YEAR + 1, 1, 1),
            Err(LunarError::OutOfRange)
        );
        assert!(solar_to_lunar(MIN_SOLAR_YEAR, 6, 1).is_ok());
        assert!(solar_to_lunar(MAX_SOLAR_YEAR, 6, 1).is_ok());
    }

    #[test]
    fn rejects_nominal_field_violations() {
        assert_eq!(solar_to_lunar(2020, 0, 1), Err(LunarError::OutOfRange));
        assert_eq!(solar_to_lunar(2020, 13, 1), Err(LunarError::OutOfRange));
        assert_eq!(solar_to_lunar(2020, 6, 0), Err(LunarError::OutOfRange));
        assert_eq!(solar_to_lunar(2020, 6, 32), Err(LunarError::OutOfRange));
    }

    #[test]
    fn output_ranges_hold_across_the_whole_table() {
        for year in MIN_SOLAR_YEAR..=MAX_SOLAR_YEAR {
            for month in 1..=12u8 {
                for day in 1..=31u8 {
                    let lunar = solar_to_lunar(year, month, day).unwrap();
                    assert!((1..=12).contains(&lunar.month), "{year}-{month}-{day}");
                    assert!((1..=30).contains(&lunar.day), "{year}-{month}-{day}");
                    if lunar.is_leap_month {
                        let entry = MONTH_TABLE[(lunar.year - TABLE_FIRST_YEAR) as usize];
                        assert_eq!(leap_month_of(entry), lunar.month);
                    }
                }
            }
        }
    }

    #[test]
    fn sexagenary_indices_derive_from_the_year() {
        let lunar = solar_to_lunar(2020, 10, 1).unwrap();
        assert_eq!(lunar.zodiac_index(), (2020 % 12) as u8);
        assert_eq!(lunar.heavenly_stem_index(), (2020 % 10) as u8);
        assert_eq!(lunar.earthly_branch_index(), (2020 % 12) as u8);
    }
}
