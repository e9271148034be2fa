mod rial;

pub mod helpers;

pub use rial::{Rial, RialConversionError, RIAL_CURRENCY_CODE, RIAL_CURRENCY_CODE_LOWER};
