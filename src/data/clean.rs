use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Locale-formatted numbers
// ---------------------------------------------------------------------------

/// Parse a Danish-formatted amount such as `"1.234,56 kr"`.
///
/// Everything except digits, `,`, `.` and `-` is stripped. When a comma is
/// present it is the decimal separator and every `.` is a thousands
/// separator. Returns `None` for anything that still does not parse.
pub fn parse_locale_number(raw: &str) -> Option<f64> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if kept.is_empty() {
        return None;
    }

    let normalized = if kept.contains(',') {
        kept.replace('.', "").replace(',', ".")
    } else {
        kept
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// How to read an all-numeric date like `03/01/2022`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    /// `03/01/2022` is 1 March.
    MonthFirst,
    /// `03/01/2022` is 3 January.
    DayFirst,
}

/// Parse a date written as text.
///
/// Year-first dates (`2022-03-01`, `2022/03/01`) are unambiguous. For
/// year-last dates the preferred `order` is tried first and the other order
/// is the fallback, so `25/03/2022` still parses as month-first input. A
/// trailing time of day (`2022-03-01 00:00:00`, `2022-03-01T08:30`) is
/// ignored.
pub fn parse_date(raw: &str, order: DateOrder) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.split([' ', 'T']).next()?;
    if date_part.is_empty() {
        return None;
    }

    let parts: Vec<&str> = date_part.split(['-', '/', '.']).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    if parts[0].len() == 4 {
        let year: i32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        let day: u32 = parts[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let year = match parts[2].len() {
        4 => parts[2].parse::<i32>().ok()?,
        2 => expand_two_digit_year(parts[2].parse::<i32>().ok()?),
        _ => return None,
    };
    let a: u32 = parts[0].parse().ok()?;
    let b: u32 = parts[1].parse().ok()?;

    let (month, day) = match order {
        DateOrder::MonthFirst => (a, b),
        DateOrder::DayFirst => (b, a),
    };
    NaiveDate::from_ymd_opt(year, month, day).or_else(|| NaiveDate::from_ymd_opt(year, day, month))
}

/// `%y` convention: 69-99 land in the 1900s, 00-68 in the 2000s.
fn expand_two_digit_year(yy: i32) -> i32 {
    if yy >= 69 {
        1900 + yy
    } else {
        2000 + yy
    }
}
