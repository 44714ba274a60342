pub mod pprof;
