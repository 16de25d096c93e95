//! Maps the `fake` transformer's generator-kind strings to the `fake` crate's
//! faker library (spec §4.2 "fake" transformer). Only the subset the spec's
//! worked examples name is wired up; an unknown kind is a fatal config error
//! caught at pipeline build time, not at row time.

use fake::faker::address::en::{CityName, CountryName, StreetName};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::{Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::RngCore;
use uuid::Uuid;

use model::core::value::Value;

use crate::error::EngineError;

/// Generates one fake value for `kind` using `rng`. `kind` is dotted,
/// e.g. `"internet.email"`, `"name.first_name"`.
pub fn generate(kind: &str, rng: &mut impl RngCore) -> Result<Value, EngineError> {
    let value = match kind {
        "internet.email" => Value::String(SafeEmail().fake_with_rng(rng)),
        "name.first_name" => Value::String(FirstName().fake_with_rng(rng)),
        "name.last_name" => Value::String(LastName().fake_with_rng(rng)),
        "name.name" => Value::String(Name().fake_with_rng(rng)),
        "phone.number" => Value::String(PhoneNumber().fake_with_rng(rng)),
        "address.city" => Value::String(CityName().fake_with_rng(rng)),
        "address.street_name" => Value::String(StreetName().fake_with_rng(rng)),
        "address.country" => Value::String(CountryName().fake_with_rng(rng)),
        "company.name" => Value::String(CompanyName().fake_with_rng(rng)),
        "lorem.word" => Value::String(Word().fake_with_rng(rng)),
        "lorem.sentence" => Value::String(Sentence(5..12).fake_with_rng(rng)),
        "uuid.v4" => {
            let mut bytes = [0u8; 16];
            rng.fill_bytes(&mut bytes);
            Value::Uuid(Uuid::from_bytes(bytes))
        }
        other => {
            return Err(EngineError::Fatal(format!("unknown fake generator kind `{other}`")));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn same_seed_produces_the_same_value() {
        let a = generate("internet.email", &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let b = generate("internet.email", &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(a.as_display_string(), b.as_display_string());
    }

    #[test]
    fn unknown_kind_is_fatal() {
        let result = generate("not.a.kind", &mut ChaCha8Rng::seed_from_u64(1));
        assert!(matches!(result, Err(EngineError::Fatal(_))));
    }

    #[test]
    fn uuid_kind_produces_a_uuid_value() {
        let value = generate("uuid.v4", &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        assert!(matches!(value, Value::Uuid(_)));
    }
}
