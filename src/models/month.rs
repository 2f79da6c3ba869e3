// src/models/month.rs

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Um mês do calendário (ano + mês), sem dia. Serializado como `YYYY-MM`.
///
/// Internamente guardamos o primeiro dia do mês: a construção valida a data
/// uma única vez e todo o resto (último dia, intervalo SQL) sai daí sem `Option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first_day: NaiveDate,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(1..=9999).contains(&year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1).map(|first_day| Self { first_day })
    }

    /// O mês ao qual a data pertence.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            first_day: date - Days::new(u64::from(date.day0())),
        }
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    /// Primeiro dia do mês seguinte (limite exclusivo para filtros de intervalo).
    pub fn next_first_day(&self) -> NaiveDate {
        self.first_day + Days::new(u64::from(self.last_day()))
    }

    pub fn next(&self) -> Self {
        Self {
            first_day: self.next_first_day(),
        }
    }

    /// Quantidade de dias do mês (28, 29, 30 ou 31).
    pub fn last_day(&self) -> u32 {
        match self.month() {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            _ if is_leap_year(self.year()) => 29,
            _ => 28,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    /// Data neste mês com o dia informado, limitado ao último dia do mês
    /// (31 de janeiro em fevereiro vira 28 ou 29).
    pub fn with_day_clamped(&self, day: u32) -> NaiveDate {
        let day = day.clamp(1, self.last_day());
        self.first_day + Days::new(u64::from(day - 1))
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Mês inválido '{0}' (formato esperado: AAAA-MM)")]
pub struct ParseYearMonthError(pub String);

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseYearMonthError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
