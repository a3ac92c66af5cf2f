//! Local stages: unpack the archive, find the dataset, load it into an arrow
//! table and normalize it.

pub mod load;
pub mod locate;
pub mod normalize;
pub mod unzip;
