mod azure;
mod nodes;
mod s3;
