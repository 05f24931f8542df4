pub mod xgboost;
