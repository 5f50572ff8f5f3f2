//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::ValidationError;

use crate::state::bingo::{CardId, SELECTION_SIZE};

/// Validates that a card selection holds exactly 24 distinct card ids.
///
/// # Examples
///
/// ```ignore
/// validate_card_selection(&(1..=24).collect::<Vec<_>>()) // Ok
/// validate_card_selection(&[1, 2, 3])                    // Err - too short
/// ```
pub fn validate_card_selection(cards: &[CardId]) -> Result<(), ValidationError> {
    if cards.len() != SELECTION_SIZE {
        let mut err = ValidationError::new("selection_size");
        err.message = Some(
            format!(
                "Exactly {SELECTION_SIZE} cards must be selected (got {})",
                cards.len()
            )
            .into(),
        );
        return Err(err);
    }

    let distinct: HashSet<&CardId> = cards.iter().collect();
    if distinct.len() != cards.len() {
        let mut err = ValidationError::new("selection_duplicates");
        err.message = Some("Selected cards must be distinct".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_card_selection_valid() {
        let cards: Vec<CardId> = (1..=24).collect();
        assert!(validate_card_selection(&cards).is_ok());
        let scattered: Vec<CardId> = (0..24).map(|i| i * 7 + 3).collect();
        assert!(validate_card_selection(&scattered).is_ok());
    }

    #[test]
    fn test_validate_card_selection_invalid_length() {
        assert!(validate_card_selection(&[]).is_err());
        assert!(validate_card_selection(&(1..=23).collect::<Vec<_>>()).is_err());
        assert!(validate_card_selection(&(1..=25).collect::<Vec<_>>()).is_err());
    }

    #[test]
    fn test_validate_card_selection_duplicates() {
        let mut cards: Vec<CardId> = (1..=24).collect();
        cards[23] = 1;
        let err = validate_card_selection(&cards).unwrap_err();
        assert_eq!(err.code, "selection_duplicates");
    }
}
