//! The slice of the game contract's ABI this client speaks.

use crate::{
    error::GameError,
    game::Guess,
    units::EthAmount,
};
use alloy_primitives::{
    B256,
    U256,
};
use alloy_sol_types::{
    SolCall,
    SolEvent,
    sol,
};

sol! {
    function play(uint8 guess) external payable;

    event GamePlayed(
        address indexed player,
        uint8 guess,
        uint8 winningNumber,
        bool won,
        uint256 prize
    );
}

/// Read-only selector the deployed contract answers with its pool balance.
pub const POOL_BALANCE_SELECTOR: [u8; 4] = [0xb8, 0xa9, 0x30, 0x86];

const WORD: usize = 32;
const GAME_PLAYED_WORDS: usize = 4;

pub fn encode_play(guess: Guess) -> Vec<u8> {
    playCall {
        guess: guess.value(),
    }
    .abi_encode()
}

pub fn game_played_topic() -> B256 {
    GamePlayed::SIGNATURE_HASH
}

/// Non-indexed fields of a `GamePlayed` log.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GamePlayedLog {
    pub guess: u8,
    pub winning_number: u8,
    pub won: bool,
    pub prize: EthAmount,
}

impl GamePlayedLog {
    /// Decodes the four big-endian words `guess, winningNumber, won, prize`.
    ///
    /// Trailing bytes past the fourth word are ignored. `won` is true only for an
    /// exact 1.
    pub fn decode(data: &[u8]) -> Result<Self, GameError> {
        if data.len() < WORD * GAME_PLAYED_WORDS {
            return Err(GameError::EventDecodeFailed(format!(
                "expected at least {} bytes of log data, got {}",
                WORD * GAME_PLAYED_WORDS,
                data.len()
            )));
        }
        let word = |i: usize| U256::from_be_slice(&data[i * WORD..(i + 1) * WORD]);

        let guess = small_word(word(0), "guess")?;
        let winning_number = small_word(word(1), "winningNumber")?;
        let won = word(2) == U256::from(1u8);
        let prize = EthAmount::from_wei(word(3));

        Ok(Self {
            guess,
            winning_number,
            won,
            prize,
        })
    }
}

fn small_word(value: U256, field: &str) -> Result<u8, GameError> {
    u8::try_from(value).map_err(|_| {
        GameError::EventDecodeFailed(format!("{field} does not fit in uint8: {value}"))
    })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    fn words(values: &[u128]) -> Vec<u8> {
        values
            .iter()
            .flat_map(|v| U256::from(*v).to_be_bytes::<32>())
            .collect()
    }

    #[test]
    fn decode__reads_four_words_in_declaration_order() {
        // given
        let data = words(&[3, 7, 1, 100_000_000_000_000_000]);

        // when
        let log = GamePlayedLog::decode(&data).unwrap();

        // then
        let expected = GamePlayedLog {
            guess: 3,
            winning_number: 7,
            won: true,
            prize: EthAmount::from_wei_u128(100_000_000_000_000_000),
        };
        assert_eq!(expected, log);
        assert_eq!("0.1000", log.prize.to_string());
    }

    #[test]
    fn decode__rejects_short_payload() {
        let data = words(&[3, 7, 1]);
        let result = GamePlayedLog::decode(&data);
        assert!(matches!(result, Err(GameError::EventDecodeFailed(_))));
    }

    #[test]
    fn decode__rejects_oversized_guess_word() {
        let data = words(&[300, 7, 0, 0]);
        let result = GamePlayedLog::decode(&data);
        assert!(matches!(result, Err(GameError::EventDecodeFailed(_))));
    }

    #[test]
    fn decode__treats_non_one_flag_as_loss() {
        let data = words(&[3, 3, 2, 0]);
        let log = GamePlayedLog::decode(&data).unwrap();
        assert!(!log.won);
    }

    #[test]
    fn encode_play__selector_then_padded_guess() {
        let calldata = encode_play(Guess::new(5).unwrap());
        assert_eq!(36, calldata.len());
        assert_eq!("53a04b05", hex::encode(&calldata[..4]));
        assert_eq!(5, calldata[35]);
        assert!(calldata[4..35].iter().all(|b| *b == 0));
    }

    #[test]
    fn game_played_topic__matches_event_signature() {
        assert_eq!(
            "a3c4d48e9d25846218ebd004c737abc0e9417520d32fef8111f49d6490e1c9c8",
            hex::encode(game_played_topic())
        );
    }
}
