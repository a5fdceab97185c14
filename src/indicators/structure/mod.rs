pub mod ichimoku;
