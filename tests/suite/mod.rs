mod cli;
mod delivery;
mod persistence;
