// Pure aggregators over stat rows. Everything here takes slices and returns
// plain records; an empty slice yields an all-zero record, never an error.

pub mod averages;
pub mod compare;
pub mod contribution;
pub mod leaders;
pub mod opponents;
pub mod team;
