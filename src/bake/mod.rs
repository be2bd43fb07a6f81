//! Baking the live surface into persistent assets

pub mod baker;
pub mod identity;
pub mod material;
pub mod mesh;
pub mod store;

pub use baker::{BakedAsset, MeshBaker};
pub use identity::{IdGenerator, SequentialIds, UuidIds};
pub use material::{DisplayEntity, MaterialRecord};
pub use mesh::{BakedMesh, Bounds, ProjectionAxis};
pub use store::{AssetStore, DirectoryAssetStore, MemoryAssetStore};
