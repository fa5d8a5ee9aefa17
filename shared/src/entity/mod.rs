pub mod candle_data;
