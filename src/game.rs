use crate::units::EthAmount;
use std::fmt;

pub const MIN_GUESS: u8 = 1;
pub const MAX_GUESS: u8 = 10;

/// Fixed entry fee: 0.0001 of the native token.
pub const ENTRY_FEE_WEI: u128 = 100_000_000_000_000;

pub fn entry_fee() -> EthAmount {
    EthAmount::from_wei_u128(ENTRY_FEE_WEI)
}

/// A number the player bets on, always within `MIN_GUESS..=MAX_GUESS`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Guess(u8);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GuessOutOfRange(pub u8);

impl fmt::Display for GuessOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "guess {} is outside {MIN_GUESS}..={MAX_GUESS}", self.0)
    }
}

impl std::error::Error for GuessOutOfRange {}

impl Guess {
    pub const FIRST: Guess = Guess(MIN_GUESS);
    pub const LAST: Guess = Guess(MAX_GUESS);

    pub fn new(value: u8) -> Result<Self, GuessOutOfRange> {
        if (MIN_GUESS..=MAX_GUESS).contains(&value) {
            Ok(Self(value))
        } else {
            Err(GuessOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Guess> {
        (MIN_GUESS..=MAX_GUESS).map(Guess)
    }

    /// Next number to the right, wrapping from 10 back to 1.
    pub fn next(self) -> Self {
        if self.0 == MAX_GUESS {
            Self(MIN_GUESS)
        } else {
            Self(self.0 + 1)
        }
    }

    pub fn prev(self) -> Self {
        if self.0 == MIN_GUESS {
            Self(MAX_GUESS)
        } else {
            Self(self.0 - 1)
        }
    }
}

impl TryFrom<u8> for Guess {
    type Error = GuessOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Guess::new(value)
    }
}

impl fmt::Display for Guess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PlayRequest {
    pub guess: Guess,
    pub entry_fee: EthAmount,
}

impl PlayRequest {
    pub fn new(guess: Guess) -> Self {
        Self {
            guess,
            entry_fee: entry_fee(),
        }
    }
}

/// What one completed play resolved to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayOutcome {
    pub guess: Guess,
    // absent when the contract reverted and nothing reported the draw
    pub winning_number: Option<u8>,
    pub won: bool,
    pub prize: EthAmount,
}

impl PlayOutcome {
    pub fn lost(guess: Guess, winning_number: Option<u8>) -> Self {
        Self {
            guess,
            winning_number,
            won: false,
            prize: EthAmount::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn guess__rejects_values_outside_one_to_ten() {
        assert_eq!(Err(GuessOutOfRange(0)), Guess::new(0));
        assert_eq!(Err(GuessOutOfRange(11)), Guess::new(11));
        assert_eq!(10, Guess::all().count());
    }

    #[test]
    fn guess__next_and_prev_wrap_around() {
        let ten = Guess::new(10).unwrap();
        let one = Guess::new(1).unwrap();
        assert_eq!(one, ten.next());
        assert_eq!(ten, one.prev());
    }
}
