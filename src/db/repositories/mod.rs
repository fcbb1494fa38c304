mod baselines;
mod context_records;
mod samples;
