use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use nom::{
    character::complete::{char, digit1, space0},
    IResult,
};

use crate::error::SelectionError;
use crate::model::PageSelection;

/// A single token of a page expression: "7" or "3-5"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token<'a> {
    start: &'a str,
    end: Option<&'a str>,
}

/// Parse one token, surrounding blanks allowed
fn token(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = space0(input)?;
    let (input, start) = digit1(input)?;
    let (input, _) = space0(input)?;

    let dash: IResult<&str, char> = char('-')(input);
    let Ok((input, _)) = dash else {
        return Ok((input, Token { start, end: None }));
    };

    let (input, _) = space0(input)?;
    let (input, end) = digit1(input)?;
    let (input, _) = space0(input)?;
    Ok((
        input,
        Token {
            start,
            end: Some(end),
        },
    ))
}

fn page_number(digits: &str) -> Result<u32, SelectionError> {
    let page: u32 = digits
        .parse()
        .map_err(|_| SelectionError::InvalidNumber(digits.to_string()))?;
    if page == 0 {
        return Err(SelectionError::ZeroPage);
    }
    Ok(page)
}

fn parse_part(part: &str) -> Result<RangeInclusive<u32>, SelectionError> {
    let malformed = || {
        if part.contains('-') {
            SelectionError::InvalidRange(part.trim().to_string())
        } else {
            SelectionError::InvalidNumber(part.trim().to_string())
        }
    };

    let (rest, tok) = token(part).map_err(|_| malformed())?;
    if !rest.is_empty() {
        return Err(malformed());
    }

    let start = page_number(tok.start)?;
    let end = match tok.end {
        Some(end) => page_number(end)?,
        None => start,
    };

    if start > end {
        return Err(SelectionError::Reversed { start, end });
    }

    Ok(start..=end)
}

/// Parse a page selection such as "1,3-5,7".
///
/// `None` or a blank expression keeps every page. Ranges are inclusive and
/// token order or duplicates do not matter. Reversed ranges, page 0 and
/// anything that is not a number or `a-b` pair are rejected.
pub fn parse_page_selection(expr: Option<&str>) -> Result<PageSelection, SelectionError> {
    let expr = match expr.map(str::trim) {
        None | Some("") => return Ok(PageSelection::All),
        Some(expr) => expr,
    };

    let mut pages = BTreeSet::new();
    for part in expr.split(',') {
        pages.extend(parse_part(part)?);
    }

    Ok(PageSelection::Only(pages))
}
