pub mod capture;
pub mod contract;
pub mod error;
pub mod export;
pub mod identity;
pub mod paginate;
pub mod placeholder;
pub mod signing;
pub mod storage;

pub use capture::{PadState, SignaturePad, SignatureRaster};
pub use contract::{
    Contract, ContractStatus, ContractView, Signature, SignatureStatus, ACCESS_CODE_LEN,
};
pub use error::{Error, Result};
pub use export::{export_filename, ExportDocument, Exporter};
pub use identity::SignerIdentity;
pub use paginate::{Paginator, DEFAULT_PAGE_SIZE};
pub use placeholder::{apply_fills, autofill, scan, Placeholder, PlaceholderKind};
pub use signing::{sign_by_access_code, sign_contract, SigningRequest};
pub use storage::Storage;
