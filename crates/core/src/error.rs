use thiserror::Error;

use crate::catalog::CatalogError;
use crate::model::CodecError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}
